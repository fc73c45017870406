//! XLIFF 1.2 writer.
//!
//! See https://docs.oasis-open.org/xliff/v1.2/os/xliff-core.html

const VERSION: &str = "1.2";
const XMLNS: &str = "urn:oasis:names:tc:xliff:document:1.2";

/// One `<file>` element: a namespace translated into one target locale.
#[derive(Debug, Clone)]
pub struct XliffFile {
    pub original: String,
    pub source_language: String,
    pub target_language: String,
    pub units: Vec<XliffUnit>,
}

#[derive(Debug, Clone)]
pub struct XliffUnit {
    pub id: String,
    pub source: String,
    /// Empty when not yet translated
    pub target: String,
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn write_document(files: &[XliffFile]) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!("<xliff version=\"{}\" xmlns=\"{}\">\n", VERSION, XMLNS));

    for file in files {
        out.push_str(&format!(
            "  <file original=\"{}\" source-language=\"{}\" target-language=\"{}\" datatype=\"plaintext\">\n",
            escape_xml(&file.original),
            escape_xml(&file.source_language),
            escape_xml(&file.target_language)
        ));
        out.push_str("    <body>\n");
        for unit in &file.units {
            let state = if unit.target.is_empty() { "new" } else { "translated" };
            out.push_str(&format!(
                "      <trans-unit id=\"{}\" xml:space=\"preserve\">\n",
                escape_xml(&unit.id)
            ));
            out.push_str(&format!("        <source>{}</source>\n", escape_xml(&unit.source)));
            out.push_str(&format!(
                "        <target state=\"{}\">{}</target>\n",
                state,
                escape_xml(&unit.target)
            ));
            out.push_str("      </trans-unit>\n");
        }
        out.push_str("    </body>\n");
        out.push_str("  </file>\n");
    }

    out.push_str("</xliff>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(units: Vec<XliffUnit>) -> XliffFile {
        XliffFile {
            original: "Greeting".to_string(),
            source_language: "en".to_string(),
            target_language: "es".to_string(),
            units,
        }
    }

    #[test]
    fn test_escape_markup() {
        assert_eq!(
            escape_xml("<b>Tom & \"Jerry\"</b>"),
            "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_state_follows_target() {
        let doc = write_document(&[file(vec![
            XliffUnit {
                id: "Greeting.hello".to_string(),
                source: "Hello".to_string(),
                target: "Hola".to_string(),
            },
            XliffUnit {
                id: "Greeting.bye".to_string(),
                source: "Bye".to_string(),
                target: String::new(),
            },
        ])]);

        assert!(doc.contains("<target state=\"translated\">Hola</target>"));
        assert!(doc.contains("<target state=\"new\"></target>"));
        assert!(doc.contains("original=\"Greeting\" source-language=\"en\" target-language=\"es\""));
        assert_eq!(doc.matches("<file ").count(), 1);
    }
}
