//! Fixed package parts: content types, relationships, document properties
//! and the workbook part

use std::io::Write;

use chrono::{DateTime, Utc};

use super::workbook::{DocumentProperties, Workbook};
use super::xml_writer::XmlWriter;
use crate::address::absolute_range_ref;
use crate::error::Result;

const APPLICATION: &str = "xlsxstream";

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_OFFICE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Path of the N-th worksheet part inside the package (1-based)
pub(crate) fn sheet_part_name(number: usize) -> String {
    format!("xl/worksheets/sheet{}.xml", number)
}

pub(crate) fn write_content_types<W: Write>(writer: W, sheet_count: usize) -> Result<()> {
    let mut xml = XmlWriter::new(writer);
    xml.declaration()?;
    xml.write_str(
        "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
<Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>",
    )?;
    for number in 1..=sheet_count {
        xml.start_element("Override")?;
        xml.attribute("PartName", &format!("/{}", sheet_part_name(number)))?;
        xml.attribute(
            "ContentType",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
        )?;
        xml.close_empty()?;
    }
    xml.write_str(
        "<Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>\
<Override PartName=\"/docProps/app.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.extended-properties+xml\"/>\
</Types>",
    )?;
    xml.flush()
}

pub(crate) fn write_root_rels<W: Write>(writer: W) -> Result<()> {
    let mut xml = XmlWriter::new(writer);
    xml.declaration()?;
    xml.write_str(
        "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\
<Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties\" Target=\"docProps/core.xml\"/>\
<Relationship Id=\"rId3\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties\" Target=\"docProps/app.xml\"/>\
</Relationships>",
    )?;
    xml.flush()
}

pub(crate) fn write_core_props<W: Write>(
    writer: W,
    properties: &DocumentProperties,
    created: DateTime<Utc>,
) -> Result<()> {
    let timestamp = created.format("%Y-%m-%dT%H:%M:%SZ").to_string();

    let mut xml = XmlWriter::new(writer);
    xml.declaration()?;
    xml.start_element("cp:coreProperties")?;
    xml.attribute(
        "xmlns:cp",
        "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
    )?;
    xml.attribute("xmlns:dc", "http://purl.org/dc/elements/1.1/")?;
    xml.attribute("xmlns:dcmitype", "http://purl.org/dc/dcmitype/")?;
    xml.attribute("xmlns:dcterms", "http://purl.org/dc/terms/")?;
    xml.attribute("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance")?;
    xml.close_start_tag()?;

    if let Some(title) = &properties.title {
        xml.text_element("dc:title", title)?;
    }
    if let Some(subject) = &properties.subject {
        xml.text_element("dc:subject", subject)?;
    }
    if let Some(author) = &properties.author {
        xml.text_element("dc:creator", author)?;
    }
    if !properties.keywords.is_empty() {
        let keywords: Vec<&str> = properties.keywords.iter().map(String::as_str).collect();
        xml.text_element("cp:keywords", &keywords.join(", "))?;
    }
    if let Some(description) = &properties.description {
        xml.text_element("dc:description", description)?;
    }
    if let Some(author) = &properties.author {
        xml.text_element("cp:lastModifiedBy", author)?;
    }

    for element in ["dcterms:created", "dcterms:modified"] {
        xml.start_element(element)?;
        xml.attribute("xsi:type", "dcterms:W3CDTF")?;
        xml.close_start_tag()?;
        xml.write_str(&timestamp)?;
        xml.end_element(element)?;
    }

    xml.end_element("cp:coreProperties")?;
    xml.flush()
}

pub(crate) fn write_app_props<W: Write>(writer: W, properties: &DocumentProperties) -> Result<()> {
    let mut xml = XmlWriter::new(writer);
    xml.declaration()?;
    xml.start_element("Properties")?;
    xml.attribute(
        "xmlns",
        "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
    )?;
    xml.attribute(
        "xmlns:vt",
        "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes",
    )?;
    xml.close_start_tag()?;
    xml.text_element("Application", APPLICATION)?;
    xml.text_element("DocSecurity", "0")?;
    xml.text_element("ScaleCrop", "false")?;
    xml.text_element("Company", properties.company.as_deref().unwrap_or(""))?;
    xml.text_element("LinksUpToDate", "false")?;
    xml.text_element("SharedDoc", "false")?;
    xml.text_element("HyperlinksChanged", "false")?;
    xml.end_element("Properties")?;
    xml.flush()
}

pub(crate) fn write_workbook_xml<W: Write>(writer: W, workbook: &Workbook) -> Result<()> {
    let mut xml = XmlWriter::new(writer);
    xml.declaration()?;
    xml.start_element("workbook")?;
    xml.attribute("xmlns", NS_MAIN)?;
    xml.attribute("xmlns:r", NS_OFFICE_RELATIONSHIPS)?;
    xml.close_start_tag()?;

    xml.write_str("<workbookPr date1904=\"false\"/>")?;

    xml.write_str("<bookViews>")?;
    xml.start_element("workbookView")?;
    xml.attribute_int("activeTab", workbook.active_tab() as i64)?;
    if let Some(ratio) = workbook.tab_ratio() {
        xml.attribute_int("tabRatio", ratio as i64)?;
    }
    xml.close_empty()?;
    xml.write_str("</bookViews>")?;

    xml.start_element("sheets")?;
    xml.close_start_tag()?;
    for (i, sheet) in workbook.sheets().enumerate() {
        let sheet_id = i + 1;
        xml.start_element("sheet")?;
        xml.attribute("name", sheet.name())?;
        xml.attribute_int("sheetId", sheet_id as i64)?;
        if !sheet.visibility().is_visible() {
            xml.attribute("state", sheet.visibility().as_str())?;
        }
        xml.attribute("r:id", &format!("rId{}", sheet_id))?;
        xml.close_empty()?;
    }
    xml.end_element("sheets")?;

    let filters: Vec<(usize, String)> = workbook
        .sheets()
        .enumerate()
        .filter_map(|(i, sheet)| {
            let range = sheet.auto_filter_range()?;
            let reference = format!(
                "'{}'!{}",
                sheet.name().replace('\'', "''"),
                absolute_range_ref(range.start_row, range.start_col, range.end_row, range.end_col)
            );
            Some((i, reference))
        })
        .collect();
    if !filters.is_empty() {
        xml.start_element("definedNames")?;
        xml.close_start_tag()?;
        for (local_sheet_id, reference) in &filters {
            xml.start_element("definedName")?;
            xml.attribute("name", "_xlnm._FilterDatabase")?;
            xml.attribute_int("localSheetId", *local_sheet_id as i64)?;
            xml.attribute("hidden", "1")?;
            xml.close_start_tag()?;
            xml.write_escaped(reference)?;
            xml.end_element("definedName")?;
        }
        xml.end_element("definedNames")?;
    }

    xml.write_str("<calcPr fullCalcOnLoad=\"1\"/>")?;
    xml.end_element("workbook")?;
    xml.flush()
}

pub(crate) fn write_workbook_rels<W: Write>(writer: W, sheet_count: usize) -> Result<()> {
    let mut xml = XmlWriter::new(writer);
    xml.declaration()?;
    xml.start_element("Relationships")?;
    xml.attribute("xmlns", NS_RELATIONSHIPS)?;
    xml.close_start_tag()?;

    for number in 1..=sheet_count {
        xml.start_element("Relationship")?;
        xml.attribute("Id", &format!("rId{}", number))?;
        xml.attribute(
            "Type",
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet",
        )?;
        xml.attribute("Target", &format!("worksheets/sheet{}.xml", number))?;
        xml.close_empty()?;
    }

    // Styles relationship
    xml.start_element("Relationship")?;
    xml.attribute("Id", &format!("rId{}", sheet_count + 1))?;
    xml.attribute(
        "Type",
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles",
    )?;
    xml.attribute("Target", "styles.xml")?;
    xml.close_empty()?;

    xml.end_element("Relationships")?;
    xml.flush()
}
