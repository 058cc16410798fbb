//! HTML serialization of rendered fragments.

use super::{Fragment, ImageReference, TextRun};

/// Escape text for use in element content and quoted attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Serialize fragments to HTML. Text is escaped before any tag is added around it.
#[must_use]
pub fn to_html(fragments: &[Fragment]) -> String {
    let mut html = String::new();
    for fragment in fragments {
        match fragment {
            Fragment::Text(run) => push_text_run(&mut html, run),
            Fragment::LineBreak => html.push_str("<br>"),
            Fragment::Image(image) => push_image(&mut html, image),
        }
    }
    html
}

fn push_text_run(html: &mut String, run: &TextRun) {
    let escaped = escape_html(&run.text);
    match run.style {
        Some(style) => {
            let tag = style.tag();
            html.push_str(&format!("<{tag}>{escaped}</{tag}>"));
        }
        None => html.push_str(&escaped),
    }
}

fn push_image(html: &mut String, image: &ImageReference) {
    let path = escape_html(&image.resource_path);
    let filename = escape_html(&image.filename);
    html.push_str(&format!(
        "<div class=\"chat-image\"><a href=\"{path}\" target=\"_blank\" rel=\"noopener\">\
         <img src=\"{path}\" alt=\"Screenshot\"></a>\
         <span class=\"image-caption\">📸 {filename}</span></div>"
    ));
}

#[cfg(test)]
mod tests {
    use super::{escape_html, to_html};
    use crate::error::Result;
    use crate::render::MessageRenderer;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn untrusted_text_never_becomes_structure() -> Result<()> {
        let renderer = MessageRenderer::new()?;
        let html = to_html(&renderer.render("<script>alert(1)</script> **<b>x</b>**"));
        assert_eq!(
            html,
            "&lt;script&gt;alert(1)&lt;/script&gt; <strong>&lt;b&gt;x&lt;/b&gt;</strong>"
        );
        assert!(!html.contains("<script>"));
        Ok(())
    }

    #[test]
    fn styled_runs_and_breaks_serialize_in_order() -> Result<()> {
        let renderer = MessageRenderer::new()?;
        let html = to_html(&renderer.render("**bold** and *em*\n`code`"));
        assert_eq!(
            html,
            "<strong>bold</strong> and <em>em</em><br><code>code</code>"
        );
        Ok(())
    }

    #[test]
    fn image_fragment_links_to_resource() -> Result<()> {
        let renderer = MessageRenderer::new()?;
        let html = to_html(&renderer.render("Screenshot salva em shot1.png"));
        assert!(html.starts_with("<div class=\"chat-image\">"));
        assert!(html.contains("<img src=\"/screenshots/shot1.png\" alt=\"Screenshot\">"));
        assert!(html.contains("📸 shot1.png"));
        assert!(!html.contains("salva em"));
        Ok(())
    }
}
