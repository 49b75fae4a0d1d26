//! Style interning and `xl/styles.xml` generation
//!
//! Every distinct (number format, cell style) pair becomes one `<xf>` record
//! in `cellXfs`. Fonts, fills, borders and custom number formats are
//! deduplicated separately and referenced from the records by index.

use indexmap::{IndexMap, IndexSet};

use super::xml_writer::{push_escaped, push_number, XML_DECLARATION};
use crate::format::{NumberFormat, FIRST_CUSTOM_FORMAT_ID};
use crate::style::{BorderLineStyle, BorderSides, CellStyle, Color, HorizontalAlign, VerticalAlign};

const DEFAULT_FONT: &str = "Calibri";
const DEFAULT_FONT_SIZE: f64 = 11.0;

/// Index of a record in `cellXfs`, used as the `s` attribute of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleId(u32);

impl StyleId {
    /// The reserved default style (General, Calibri 11, no fill or border)
    pub const DEFAULT: StyleId = StyleId(0);

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<StyleId> for u32 {
    fn from(id: StyleId) -> Self {
        id.0
    }
}

/// Fully resolved formatting of a cell: number format plus visual style
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleDescriptor {
    pub number_format: NumberFormat,
    pub style: CellStyle,
}

impl StyleDescriptor {
    pub fn new(number_format: NumberFormat, style: CellStyle) -> Self {
        StyleDescriptor {
            number_format,
            style,
        }
    }

    fn key(&self) -> DescriptorKey {
        let style = &self.style;
        DescriptorKey {
            format: self.number_format.code().to_string(),
            font: style.font.clone(),
            font_size: style.font_size.map(f64::to_bits),
            flags: [
                style.bold,
                style.italic,
                style.underline,
                style.strikethrough,
                style.wrap_text,
            ],
            color: style.color,
            fill: style.fill,
            halign: style.halign,
            valign: style.valign,
            border: style.border,
            border_style: style.border_style,
            border_color: style.border_color,
            width: style.width.map(f64::to_bits),
        }
    }
}

/// Hashable projection of a descriptor; floats compare by bit pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DescriptorKey {
    format: String,
    font: Option<String>,
    font_size: Option<u64>,
    flags: [bool; 5],
    color: Option<Color>,
    fill: Option<Color>,
    halign: Option<HorizontalAlign>,
    valign: Option<VerticalAlign>,
    border: BorderSides,
    border_style: Option<BorderLineStyle>,
    border_color: Option<Color>,
    width: Option<u64>,
}

#[derive(Debug, Clone)]
struct CellXf {
    num_fmt_id: u32,
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    alignment: Option<String>,
}

/// Insertion-ordered table of unique cell formats
///
/// # Examples
///
/// ```
/// use xlsxstream::fast_writer::{StyleDescriptor, StyleId, StyleRegistry};
/// use xlsxstream::format::resolve;
/// use xlsxstream::CellStyle;
///
/// let mut registry = StyleRegistry::new();
/// let money = StyleDescriptor::new(resolve("money"), CellStyle::default());
///
/// let id = registry.intern(&money);
/// assert_eq!(id.get(), 1);
/// assert_eq!(registry.intern(&money), id);
/// assert_eq!(registry.intern(&StyleDescriptor::default()), StyleId::DEFAULT);
/// ```
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    descriptors: IndexMap<DescriptorKey, StyleId>,
    cell_xfs: Vec<CellXf>,
    num_fmts: IndexSet<String>,
    fonts: IndexSet<String>,
    fills: IndexSet<String>,
    borders: IndexSet<String>,
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleRegistry {
    /// Registry holding only the default style (ID 0)
    pub fn new() -> Self {
        let mut registry = StyleRegistry {
            descriptors: IndexMap::new(),
            cell_xfs: Vec::new(),
            num_fmts: IndexSet::new(),
            fonts: IndexSet::new(),
            fills: IndexSet::new(),
            borders: IndexSet::new(),
        };

        registry.fonts.insert(render_font(&CellStyle::default()));
        registry
            .fills
            .insert("<fill><patternFill patternType=\"none\"/></fill>".to_string());
        registry
            .fills
            .insert("<fill><patternFill patternType=\"gray125\"/></fill>".to_string());
        registry.borders.insert(render_border(&CellStyle::default()));
        registry.intern(&StyleDescriptor::default());

        registry
    }

    /// Return the ID for `descriptor`, registering it on first sight
    pub fn intern(&mut self, descriptor: &StyleDescriptor) -> StyleId {
        let key = descriptor.key();
        if let Some(id) = self.descriptors.get(&key) {
            return *id;
        }

        let id = StyleId(self.cell_xfs.len() as u32);
        let xf = self.build_xf(descriptor);
        self.cell_xfs.push(xf);
        self.descriptors.insert(key, id);
        id
    }

    /// Number of cell formats, including the default
    pub fn len(&self) -> usize {
        self.cell_xfs.len()
    }

    /// Always false: the default style is registered on construction
    pub fn is_empty(&self) -> bool {
        self.cell_xfs.is_empty()
    }

    /// Number of unique fonts
    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    /// Number of unique fills, including the two reserved ones
    pub fn fill_count(&self) -> usize {
        self.fills.len()
    }

    /// Number of unique borders
    pub fn border_count(&self) -> usize {
        self.borders.len()
    }

    /// Number format ID referenced by `id`
    pub fn num_fmt_id(&self, id: StyleId) -> Option<u32> {
        self.cell_xfs.get(id.0 as usize).map(|xf| xf.num_fmt_id)
    }

    fn build_xf(&mut self, descriptor: &StyleDescriptor) -> CellXf {
        let style = &descriptor.style;

        let num_fmt_id = match descriptor.number_format.builtin_id() {
            Some(builtin) => builtin,
            None => {
                let (index, _) = self
                    .num_fmts
                    .insert_full(descriptor.number_format.code().to_string());
                FIRST_CUSTOM_FORMAT_ID + index as u32
            }
        };

        let (font_id, _) = self.fonts.insert_full(render_font(style));
        let fill_id = match style.fill {
            Some(color) => self.fills.insert_full(render_fill(color)).0,
            None => 0,
        };
        let (border_id, _) = self.borders.insert_full(render_border(style));

        CellXf {
            num_fmt_id,
            font_id,
            fill_id,
            border_id,
            alignment: render_alignment(style),
        }
    }

    /// Serialize the complete `xl/styles.xml` part
    pub fn export_styles_part(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1024 + self.cell_xfs.len() * 96);
        let mut num = itoa::Buffer::new();

        out.extend_from_slice(XML_DECLARATION);
        out.extend_from_slice(
            b"<styleSheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">",
        );

        if !self.num_fmts.is_empty() {
            out.extend_from_slice(b"<numFmts count=\"");
            out.extend_from_slice(num.format(self.num_fmts.len()).as_bytes());
            out.extend_from_slice(b"\">");
            for (index, code) in self.num_fmts.iter().enumerate() {
                out.extend_from_slice(b"<numFmt numFmtId=\"");
                out.extend_from_slice(
                    num.format(FIRST_CUSTOM_FORMAT_ID + index as u32).as_bytes(),
                );
                out.extend_from_slice(b"\" formatCode=\"");
                push_escaped(&mut out, code);
                out.extend_from_slice(b"\"/>");
            }
            out.extend_from_slice(b"</numFmts>");
        }

        push_table(&mut out, "fonts", &self.fonts);
        push_table(&mut out, "fills", &self.fills);
        push_table(&mut out, "borders", &self.borders);

        out.extend_from_slice(
            b"<cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>",
        );

        out.extend_from_slice(b"<cellXfs count=\"");
        out.extend_from_slice(num.format(self.cell_xfs.len()).as_bytes());
        out.extend_from_slice(b"\">");
        for xf in &self.cell_xfs {
            push_xf(&mut out, xf);
        }
        out.extend_from_slice(b"</cellXfs>");

        out.extend_from_slice(
            b"<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>",
        );
        out.extend_from_slice(b"</styleSheet>");
        out
    }
}

fn push_table(out: &mut Vec<u8>, name: &str, entries: &IndexSet<String>) {
    let mut num = itoa::Buffer::new();
    out.push(b'<');
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b" count=\"");
    out.extend_from_slice(num.format(entries.len()).as_bytes());
    out.extend_from_slice(b"\">");
    for entry in entries {
        out.extend_from_slice(entry.as_bytes());
    }
    out.extend_from_slice(b"</");
    out.extend_from_slice(name.as_bytes());
    out.push(b'>');
}

fn push_xf(out: &mut Vec<u8>, xf: &CellXf) {
    let mut num = itoa::Buffer::new();
    out.extend_from_slice(b"<xf numFmtId=\"");
    out.extend_from_slice(num.format(xf.num_fmt_id).as_bytes());
    out.extend_from_slice(b"\" fontId=\"");
    out.extend_from_slice(num.format(xf.font_id).as_bytes());
    out.extend_from_slice(b"\" fillId=\"");
    out.extend_from_slice(num.format(xf.fill_id).as_bytes());
    out.extend_from_slice(b"\" borderId=\"");
    out.extend_from_slice(num.format(xf.border_id).as_bytes());
    out.extend_from_slice(b"\" xfId=\"0\"");

    if xf.num_fmt_id != 0 {
        out.extend_from_slice(b" applyNumberFormat=\"1\"");
    }
    if xf.font_id != 0 {
        out.extend_from_slice(b" applyFont=\"1\"");
    }
    if xf.fill_id != 0 {
        out.extend_from_slice(b" applyFill=\"1\"");
    }
    if xf.border_id != 0 {
        out.extend_from_slice(b" applyBorder=\"1\"");
    }

    match &xf.alignment {
        Some(alignment) => {
            out.extend_from_slice(b" applyAlignment=\"1\">");
            out.extend_from_slice(alignment.as_bytes());
            out.extend_from_slice(b"</xf>");
        }
        None => out.extend_from_slice(b"/>"),
    }
}

fn render_font(style: &CellStyle) -> String {
    let mut out = Vec::with_capacity(96);
    out.extend_from_slice(b"<font>");
    if style.bold {
        out.extend_from_slice(b"<b/>");
    }
    if style.italic {
        out.extend_from_slice(b"<i/>");
    }
    if style.strikethrough {
        out.extend_from_slice(b"<strike/>");
    }
    if style.underline {
        out.extend_from_slice(b"<u/>");
    }
    out.extend_from_slice(b"<sz val=\"");
    push_number(&mut out, style.font_size.unwrap_or(DEFAULT_FONT_SIZE));
    out.extend_from_slice(b"\"/>");
    if let Some(color) = style.color {
        out.extend_from_slice(b"<color rgb=\"");
        out.extend_from_slice(color.to_argb_hex().as_bytes());
        out.extend_from_slice(b"\"/>");
    }
    out.extend_from_slice(b"<name val=\"");
    push_escaped(&mut out, style.font.as_deref().unwrap_or(DEFAULT_FONT));
    out.extend_from_slice(b"\"/></font>");
    String::from_utf8_lossy(&out).into_owned()
}

fn render_fill(color: Color) -> String {
    format!(
        "<fill><patternFill patternType=\"solid\"><fgColor rgb=\"{}\"/><bgColor indexed=\"64\"/></patternFill></fill>",
        color.to_argb_hex()
    )
}

fn render_border(style: &CellStyle) -> String {
    let sides = style.border;
    let line = style.border_style.unwrap_or_default().as_str();
    let color = match style.border_color {
        Some(color) => format!("<color rgb=\"{}\"/>", color.to_argb_hex()),
        None => "<color auto=\"1\"/>".to_string(),
    };

    let mut out = String::from("<border>");
    for (name, present) in [
        ("left", sides.left),
        ("right", sides.right),
        ("top", sides.top),
        ("bottom", sides.bottom),
    ] {
        if present {
            out.push_str(&format!("<{name} style=\"{line}\">{color}</{name}>"));
        } else {
            out.push_str(&format!("<{name}/>"));
        }
    }
    out.push_str("<diagonal/></border>");
    out
}

fn render_alignment(style: &CellStyle) -> Option<String> {
    if style.halign.is_none() && style.valign.is_none() && !style.wrap_text {
        return None;
    }

    let mut out = String::from("<alignment");
    if let Some(halign) = style.halign {
        out.push_str(" horizontal=\"");
        out.push_str(halign.as_str());
        out.push('"');
    }
    if let Some(valign) = style.valign {
        out.push_str(" vertical=\"");
        out.push_str(valign.as_str());
        out.push('"');
    }
    if style.wrap_text {
        out.push_str(" wrapText=\"1\"");
    }
    out.push_str("/>");
    Some(out)
}
