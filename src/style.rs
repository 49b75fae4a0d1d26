//! Cell formatting options
//!
//! [`CellStyle`] is the caller-facing description of how a cell looks. The
//! number format is not part of it: formats come from the column type and are
//! combined with the style when the cell is written.

use std::fmt;

/// An opaque ARGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color(u32);

impl Color {
    /// Build from red, green and blue components
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color(0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// Parse `#rgb`, `#rrggbb` or `#aarrggbb` (the `#` is optional)
    ///
    /// # Examples
    ///
    /// ```
    /// use xlsxstream::style::Color;
    ///
    /// assert_eq!(Color::parse("#f00"), Some(Color::rgb(255, 0, 0)));
    /// assert_eq!(Color::parse("eeeeee").unwrap().to_argb_hex(), "FFEEEEEE");
    /// assert_eq!(Color::parse("#12"), None);
    /// ```
    pub fn parse(input: &str) -> Option<Self> {
        let hex = input.trim().trim_start_matches('#');
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let expanded: String = hex.chars().flat_map(|c| [c, c]).collect();
                u32::from_str_radix(&expanded, 16)
                    .ok()
                    .map(|v| Color(0xFF00_0000 | v))
            }
            6 => u32::from_str_radix(hex, 16)
                .ok()
                .map(|v| Color(0xFF00_0000 | v)),
            8 => u32::from_str_radix(hex, 16).ok().map(Color),
            _ => None,
        }
    }

    /// Uppercase `AARRGGBB`, the form used by `rgb` attributes
    pub fn to_argb_hex(self) -> String {
        format!("{:08X}", self.0)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// Horizontal alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
    Justify,
    Fill,
}

impl HorizontalAlign {
    /// Parse an option value; `"none"` and `"general"` mean no alignment
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Some(HorizontalAlign::Left),
            "center" | "centre" => Some(HorizontalAlign::Center),
            "right" => Some(HorizontalAlign::Right),
            "justify" => Some(HorizontalAlign::Justify),
            "fill" => Some(HorizontalAlign::Fill),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HorizontalAlign::Left => "left",
            HorizontalAlign::Center => "center",
            HorizontalAlign::Right => "right",
            HorizontalAlign::Justify => "justify",
            HorizontalAlign::Fill => "fill",
        }
    }
}

/// Vertical alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
    Distributed,
}

impl VerticalAlign {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "top" => Some(VerticalAlign::Top),
            "center" | "centre" => Some(VerticalAlign::Center),
            "bottom" => Some(VerticalAlign::Bottom),
            "distributed" => Some(VerticalAlign::Distributed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VerticalAlign::Top => "top",
            VerticalAlign::Center => "center",
            VerticalAlign::Bottom => "bottom",
            VerticalAlign::Distributed => "distributed",
        }
    }
}

/// Which sides of a cell carry a border
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BorderSides {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl BorderSides {
    /// All four sides
    pub fn all() -> Self {
        BorderSides {
            left: true,
            right: true,
            top: true,
            bottom: true,
        }
    }

    /// Parse a comma-combination such as `"left,top,bottom"`; unknown names are ignored
    pub fn parse(value: &str) -> Self {
        let mut sides = BorderSides::default();
        for part in value.split(',') {
            match part.trim().to_ascii_lowercase().as_str() {
                "left" => sides.left = true,
                "right" => sides.right = true,
                "top" => sides.top = true,
                "bottom" => sides.bottom = true,
                "" => {}
                other => log::debug!("ignoring unknown border side {other:?}"),
            }
        }
        sides
    }

    pub fn is_empty(&self) -> bool {
        !(self.left || self.right || self.top || self.bottom)
    }
}

/// Border line style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum BorderLineStyle {
    #[default]
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

impl BorderLineStyle {
    pub fn parse(value: &str) -> Option<Self> {
        let style = match value.trim().to_ascii_lowercase().as_str() {
            "thin" => BorderLineStyle::Thin,
            "medium" => BorderLineStyle::Medium,
            "thick" => BorderLineStyle::Thick,
            "dashed" => BorderLineStyle::Dashed,
            "dotted" => BorderLineStyle::Dotted,
            "double" => BorderLineStyle::Double,
            "hair" => BorderLineStyle::Hair,
            "mediumdashed" => BorderLineStyle::MediumDashed,
            "dashdot" => BorderLineStyle::DashDot,
            "mediumdashdot" => BorderLineStyle::MediumDashDot,
            "dashdotdot" => BorderLineStyle::DashDotDot,
            "mediumdashdotdot" => BorderLineStyle::MediumDashDotDot,
            "slantdashdot" => BorderLineStyle::SlantDashDot,
            _ => return None,
        };
        Some(style)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BorderLineStyle::Thin => "thin",
            BorderLineStyle::Medium => "medium",
            BorderLineStyle::Thick => "thick",
            BorderLineStyle::Dashed => "dashed",
            BorderLineStyle::Dotted => "dotted",
            BorderLineStyle::Double => "double",
            BorderLineStyle::Hair => "hair",
            BorderLineStyle::MediumDashed => "mediumDashed",
            BorderLineStyle::DashDot => "dashDot",
            BorderLineStyle::MediumDashDot => "mediumDashDot",
            BorderLineStyle::DashDotDot => "dashDotDot",
            BorderLineStyle::MediumDashDotDot => "mediumDashDotDot",
            BorderLineStyle::SlantDashDot => "slantDashDot",
        }
    }
}

/// Visual formatting of a cell
///
/// Every field defaults to "not set", which renders as the workbook default
/// (Calibri 11, no fill, no border, general alignment).
///
/// # Examples
///
/// ```
/// use xlsxstream::style::{BorderSides, CellStyle, HorizontalAlign};
///
/// let style = CellStyle::new()
///     .with_font("Arial")
///     .with_font_size(10.0)
///     .bold()
///     .with_halign(HorizontalAlign::Center)
///     .with_border(BorderSides::all());
///
/// let same = CellStyle::from_options([
///     ("font", "Arial"),
///     ("font-size", "10"),
///     ("font-style", "bold"),
///     ("halign", "center"),
///     ("border", "left,right,top,bottom"),
/// ]);
/// assert_eq!(style, same);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CellStyle {
    /// Font family name
    pub font: Option<String>,
    /// Font size in points
    pub font_size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    /// Text color
    pub color: Option<Color>,
    /// Solid background fill
    pub fill: Option<Color>,
    pub halign: Option<HorizontalAlign>,
    pub valign: Option<VerticalAlign>,
    pub border: BorderSides,
    /// Line style for the sides in `border` (thin when unset)
    pub border_style: Option<BorderLineStyle>,
    pub border_color: Option<Color>,
    pub wrap_text: bool,
    /// Column width hint, applied to header columns without an explicit width
    pub width: Option<f64>,
}

impl CellStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a style from string option pairs
    ///
    /// Recognized keys: `font`, `font-size`, `font-style` (comma-combination of
    /// bold/italic/underline/strikethrough), `color`, `fill`, `halign`,
    /// `valign`, `border` (comma-combination of left/right/top/bottom),
    /// `border-style`, `border-color`, `wrap_text`, `width`. Unknown keys and
    /// unparsable values are ignored.
    pub fn from_options<I, K, V>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut style = CellStyle::default();
        for (key, value) in options {
            style.apply_option(key.as_ref(), value.as_ref());
        }
        style
    }

    fn apply_option(&mut self, key: &str, value: &str) {
        let value = value.trim();
        match key.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "font" => {
                if !value.is_empty() {
                    self.font = Some(value.to_string());
                }
            }
            "font-size" => match value.parse::<f64>() {
                Ok(size) if size > 0.0 => self.font_size = Some(size),
                _ => log::debug!("ignoring font-size {value:?}"),
            },
            "font-style" => {
                for part in value.split(',') {
                    match part.trim().to_ascii_lowercase().as_str() {
                        "bold" => self.bold = true,
                        "italic" => self.italic = true,
                        "underline" => self.underline = true,
                        "strikethrough" => self.strikethrough = true,
                        "" => {}
                        other => log::debug!("ignoring font-style {other:?}"),
                    }
                }
            }
            "color" => self.color = parse_color_option(key, value),
            "fill" => self.fill = parse_color_option(key, value),
            "halign" => self.halign = HorizontalAlign::parse(value),
            "valign" => self.valign = VerticalAlign::parse(value),
            "border" => self.border = BorderSides::parse(value),
            "border-style" => self.border_style = BorderLineStyle::parse(value),
            "border-color" => self.border_color = parse_color_option(key, value),
            "wrap-text" => self.wrap_text = parse_flag(value),
            "width" => match value.parse::<f64>() {
                Ok(width) if width > 0.0 => self.width = Some(width),
                _ => log::debug!("ignoring width {value:?}"),
            },
            other => log::debug!("ignoring unknown style option {other:?}"),
        }
    }

    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = Some(font.into());
        self
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    pub fn strikethrough(mut self) -> Self {
        self.strikethrough = true;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_fill(mut self, color: Color) -> Self {
        self.fill = Some(color);
        self
    }

    pub fn with_halign(mut self, align: HorizontalAlign) -> Self {
        self.halign = Some(align);
        self
    }

    pub fn with_valign(mut self, align: VerticalAlign) -> Self {
        self.valign = Some(align);
        self
    }

    pub fn with_border(mut self, sides: BorderSides) -> Self {
        self.border = sides;
        self
    }

    pub fn with_border_style(mut self, style: BorderLineStyle) -> Self {
        self.border_style = Some(style);
        self
    }

    pub fn with_border_color(mut self, color: Color) -> Self {
        self.border_color = Some(color);
        self
    }

    pub fn with_wrap_text(mut self, wrap: bool) -> Self {
        self.wrap_text = wrap;
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }
}

fn parse_color_option(key: &str, value: &str) -> Option<Color> {
    let color = Color::parse(value);
    if color.is_none() {
        log::debug!("ignoring {key} color {value:?}");
    }
    color
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
