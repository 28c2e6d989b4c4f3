//! Streaming OFX document writer.
//!
//! [`DocumentWriter`] appends markup to its sink in call order and keeps an
//! explicit stack of open elements. Every `end_element` must match an earlier
//! `start_element`; the writer never closes elements on its own, so an
//! unbalanced call sequence surfaces as [`ExportError::Structural`].
//!
//! Output layout:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <?OFX OFXHEADER="200" VERSION="220" SECURITY="NONE" OLDFILEUID="NONE" NEWFILEUID="NONE"?>
//! <OFX>
//!   <SIGNONMSGSRSV1>
//!     <SONRS>
//!       <STATUS>
//!         <CODE>0</CODE>
//! ...
//! </OFX>
//! ```

use crate::error::{ExportError, Result};
use chrono::{Datelike, NaiveDateTime};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Name of the document's root element.
pub const ROOT_ELEMENT: &str = "OFX";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const OFX_HEADER: &str =
    r#"<?OFX OFXHEADER="200" VERSION="220" SECURITY="NONE" OLDFILEUID="NONE" NEWFILEUID="NONE"?>"#;
const INDENT: &str = "  ";
const DATE_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// What has been written inside an open element so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Content {
    /// Only `<NAME` has been written; the tag is still unterminated.
    Nothing,
    Text,
    Children,
}

#[derive(Debug)]
struct OpenElement {
    name: String,
    content: Content,
}

/// Writes a single OFX document to an owned sink.
///
/// # Examples
///
/// ```
/// use fints_ofx::DocumentWriter;
///
/// let mut writer = DocumentWriter::new(Vec::new());
/// writer.start_document().unwrap();
/// writer.write_element("LANGUAGE", "GER").unwrap();
/// let bytes = writer.end_document().unwrap();
///
/// let text = String::from_utf8(bytes).unwrap();
/// assert!(text.ends_with("<OFX>\n  <LANGUAGE>GER</LANGUAGE>\n</OFX>\n"));
/// ```
#[derive(Debug)]
pub struct DocumentWriter<W: Write> {
    sink: W,
    stack: Vec<OpenElement>,
    started: bool,
}

impl DocumentWriter<BufWriter<File>> {
    /// Creates (or truncates) the file at `path` and binds a writer to it.
    ///
    /// The file is wrapped in a [`BufWriter`]: writes reach it in call order
    /// but only hit the disk when the buffer fills, on
    /// [`end_document`](Self::end_document), or when the writer is dropped.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| ExportError::Sink {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(DocumentWriter::new(BufWriter::new(file)))
    }
}

impl<W: Write> DocumentWriter<W> {
    /// Binds a writer to an already opened sink.
    pub fn new(sink: W) -> Self {
        DocumentWriter {
            sink,
            stack: Vec::new(),
            started: false,
        }
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Writes the XML declaration and OFX header, then opens the root element.
    pub fn start_document(&mut self) -> Result<()> {
        if self.started || !self.stack.is_empty() {
            return Err(ExportError::Structural(
                "document already started".to_string(),
            ));
        }
        self.started = true;
        writeln!(self.sink, "{}", XML_DECLARATION)?;
        writeln!(self.sink, "{}", OFX_HEADER)?;
        self.start_element(ROOT_ELEMENT)
    }

    /// Closes the root element, flushes and releases the sink.
    ///
    /// Fails if anything other than the root element is still open.
    pub fn end_document(mut self) -> Result<W> {
        let only_root = self.stack.len() == 1 && self.stack[0].name == ROOT_ELEMENT;
        if !only_root {
            return Err(ExportError::Structural(format!(
                "end_document with open elements [{}]",
                self.open_element_names().join(", ")
            )));
        }
        self.end_element()?;
        self.sink.flush()?;
        Ok(self.sink)
    }

    /// Opens `name` one level below the current element.
    pub fn start_element(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        if let Some(parent) = self.stack.last_mut() {
            match parent.content {
                Content::Nothing => {
                    self.sink.write_all(b">\n")?;
                    parent.content = Content::Children;
                }
                Content::Children => {}
                Content::Text => {
                    return Err(ExportError::Structural(format!(
                        "cannot open <{}> inside <{}> which already has text",
                        name, parent.name
                    )));
                }
            }
        }

        let indent = INDENT.repeat(self.stack.len());
        write!(self.sink, "{}<{}", indent, name)?;
        self.stack.push(OpenElement {
            name: name.to_string(),
            content: Content::Nothing,
        });
        Ok(())
    }

    /// Closes the most recently opened element.
    pub fn end_element(&mut self) -> Result<()> {
        let element = self.stack.pop().ok_or_else(|| {
            ExportError::Structural("end_element with no open element".to_string())
        })?;

        match element.content {
            Content::Nothing => self.sink.write_all(b"/>\n")?,
            Content::Text => writeln!(self.sink, "</{}>", element.name)?,
            Content::Children => {
                let indent = INDENT.repeat(self.stack.len());
                writeln!(self.sink, "{}</{}>", indent, element.name)?;
            }
        }
        Ok(())
    }

    /// Writes a leaf element with escaped text content.
    pub fn write_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start_element(name)?;
        self.write_text(text)?;
        self.end_element()
    }

    /// Writes a leaf element holding `instant` as `YYYYMMDDHHMMSS`.
    ///
    /// The instant is rendered as given; no timezone conversion happens.
    pub fn write_date_time(&mut self, name: &str, instant: &NaiveDateTime) -> Result<()> {
        if !(0..=9999).contains(&instant.year()) {
            return Err(ExportError::Structural(format!(
                "<{}> timestamp {} has no four digit year",
                name, instant
            )));
        }
        let formatted = instant.format(DATE_TIME_FORMAT).to_string();
        self.write_element(name, &formatted)
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        let element = self.stack.last_mut().ok_or_else(|| {
            ExportError::Structural("text written outside of any element".to_string())
        })?;
        match element.content {
            Content::Nothing => self.sink.write_all(b">")?,
            Content::Text => {}
            Content::Children => {
                return Err(ExportError::Structural(format!(
                    "cannot write text into <{}> which has child elements",
                    element.name
                )));
            }
        }
        element.content = Content::Text;
        self.sink.write_all(escape(text).as_bytes())?;
        Ok(())
    }

    fn open_element_names(&self) -> Vec<&str> {
        self.stack.iter().map(|e| e.name.as_str()).collect()
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ExportError::Structural(format!(
            "invalid element name '{}'",
            name
        )))
    }
}

/// Escapes text content.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\r' => escaped.push_str("&#13;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
        <?OFX OFXHEADER=\"200\" VERSION=\"220\" SECURITY=\"NONE\" OLDFILEUID=\"NONE\" NEWFILEUID=\"NONE\"?>\n";

    fn render<F>(body: F) -> String
    where
        F: FnOnce(&mut DocumentWriter<Vec<u8>>) -> Result<()>,
    {
        let mut writer = DocumentWriter::new(Vec::new());
        writer.start_document().unwrap();
        body(&mut writer).unwrap();
        String::from_utf8(writer.end_document().unwrap()).unwrap()
    }

    fn instant(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_empty_document() {
        let output = render(|_| Ok(()));
        assert_eq!(output, format!("{}<OFX/>\n", HEADER));
    }

    #[test]
    fn test_empty_document_is_reproducible() {
        assert_eq!(render(|_| Ok(())), render(|_| Ok(())));
    }

    #[test]
    fn test_nested_elements_are_indented() {
        let output = render(|w| {
            w.start_element("SONRS")?;
            w.start_element("STATUS")?;
            w.write_element("CODE", "0")?;
            w.end_element()?;
            w.write_element("LANGUAGE", "GER")?;
            w.end_element()
        });

        let expected = format!(
            "{}<OFX>\n  <SONRS>\n    <STATUS>\n      <CODE>0</CODE>\n    </STATUS>\n    <LANGUAGE>GER</LANGUAGE>\n  </SONRS>\n</OFX>\n",
            HEADER
        );
        assert_eq!(output, expected);
    }

    #[test]
    fn test_empty_child_element_self_closes() {
        let output = render(|w| {
            w.start_element("BANKMSGSRSV1")?;
            w.end_element()
        });
        assert_eq!(output, format!("{}<OFX>\n  <BANKMSGSRSV1/>\n</OFX>\n", HEADER));
    }

    #[test]
    fn test_text_is_escaped() {
        let output = render(|w| w.write_element("NAME", "Smith & Sons <GmbH>"));
        assert!(output.contains("<NAME>Smith &amp; Sons &lt;GmbH&gt;</NAME>"));
    }

    #[test]
    fn test_quotes_and_carriage_returns_are_escaped() {
        let output = render(|w| w.write_element("MEMO", "Say \"hi\"\r\nbye"));
        assert!(output.contains("<MEMO>Say &quot;hi&quot;&#13;\nbye</MEMO>"));
        assert!(!output.contains('\r'));
    }

    #[test]
    fn test_apostrophes_and_newlines_are_kept() {
        let output = render(|w| w.write_element("NAME", "O'Brien\nLtd"));
        assert!(output.contains("<NAME>O'Brien\nLtd</NAME>"));
    }

    #[test]
    fn test_empty_text_writes_open_and_close_tag() {
        let output = render(|w| w.write_element("NAME", ""));
        assert!(output.contains("  <NAME></NAME>\n"));
    }

    #[test]
    fn test_write_date_time() {
        let output = render(|w| w.write_date_time("test", &instant(2018, 1, 1, 13, 37, 0)));
        assert_eq!(
            output,
            format!("{}<OFX>\n  <test>20180101133700</test>\n</OFX>\n", HEADER)
        );
    }

    #[test]
    fn test_write_date_time_is_always_fourteen_digits() {
        for value in [
            instant(1, 1, 1, 0, 0, 0),
            instant(999, 12, 31, 23, 59, 59),
            instant(2023, 6, 5, 4, 3, 2),
            instant(9999, 12, 31, 23, 59, 59),
        ] {
            let mut writer = DocumentWriter::new(Vec::new());
            writer.write_date_time("D", &value).unwrap();
            let output = String::from_utf8(writer.sink).unwrap();
            let digits = output
                .trim_end()
                .trim_start_matches("<D>")
                .trim_end_matches("</D>");
            assert_eq!(digits.len(), 14, "for {}", value);
            assert!(digits.chars().all(|c| c.is_ascii_digit()), "for {}", value);
        }
    }

    #[test]
    fn test_write_date_time_rejects_five_digit_year() {
        let mut writer = DocumentWriter::new(Vec::new());
        let result = writer.write_date_time("D", &instant(10000, 1, 1, 0, 0, 0));
        assert!(matches!(result, Err(ExportError::Structural(_))));
    }

    #[test]
    fn test_end_element_without_open_element() {
        let mut writer = DocumentWriter::new(Vec::new());
        assert!(matches!(
            writer.end_element(),
            Err(ExportError::Structural(_))
        ));
    }

    #[test]
    fn test_closing_root_twice_fails() {
        let mut writer = DocumentWriter::new(Vec::new());
        writer.start_document().unwrap();
        writer.end_element().unwrap();
        assert!(matches!(
            writer.end_element(),
            Err(ExportError::Structural(_))
        ));
    }

    #[test]
    fn test_end_document_with_unclosed_element() {
        let mut writer = DocumentWriter::new(Vec::new());
        writer.start_document().unwrap();
        writer.start_element("BANKMSGSRSV1").unwrap();

        let err = writer.end_document().unwrap_err();
        match err {
            ExportError::Structural(message) => {
                assert!(message.contains("OFX, BANKMSGSRSV1"), "{}", message)
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_end_document_after_root_closed() {
        let mut writer = DocumentWriter::new(Vec::new());
        writer.start_document().unwrap();
        writer.end_element().unwrap();
        assert!(matches!(
            writer.end_document(),
            Err(ExportError::Structural(_))
        ));
    }

    #[test]
    fn test_end_document_without_start() {
        let writer = DocumentWriter::new(Vec::new());
        assert!(matches!(
            writer.end_document(),
            Err(ExportError::Structural(_))
        ));
    }

    #[test]
    fn test_start_document_twice() {
        let mut writer = DocumentWriter::new(Vec::new());
        writer.start_document().unwrap();
        assert!(matches!(
            writer.start_document(),
            Err(ExportError::Structural(_))
        ));
    }

    #[test]
    fn test_child_after_text_fails() {
        let mut writer = DocumentWriter::new(Vec::new());
        writer.start_element("A").unwrap();
        writer.write_text("x").unwrap();
        assert!(matches!(
            writer.start_element("B"),
            Err(ExportError::Structural(_))
        ));
    }

    #[test]
    fn test_invalid_element_name() {
        let mut writer = DocumentWriter::new(Vec::new());
        assert!(writer.start_element("").is_err());
        assert!(writer.start_element("A B").is_err());
        assert!(writer.start_element("A>").is_err());
        assert_eq!(writer.depth(), 0);
    }

    #[test]
    fn test_create_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ofx");

        let mut writer = DocumentWriter::create(&path).unwrap();
        writer.start_document().unwrap();
        writer.end_document().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("{}<OFX/>\n", HEADER));
    }

    #[test]
    fn test_dropped_writer_flushes_partial_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ofx");

        let mut writer = DocumentWriter::create(&path).unwrap();
        writer.start_document().unwrap();
        writer.write_element("NAME", "partial").unwrap();
        drop(writer);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("{}<OFX>\n  <NAME>partial</NAME>\n", HEADER));
    }

    #[test]
    fn test_create_in_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.ofx");
        assert!(matches!(
            DocumentWriter::create(&path),
            Err(ExportError::Sink { .. })
        ));
    }
}
