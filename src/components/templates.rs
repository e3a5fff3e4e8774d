use std::collections::{BTreeMap, HashMap};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info};

use crate::errors::WikiError;
use crate::services::{IndexBuilder, LinkRewriter};
use crate::types::{Markup, Page};
use crate::utils::{escape_attr, escape_html, escape_html_bytes};

const LAYOUT_EXTENSION: &str = "html";
const FRAGMENT_EXTENSION: &str = "tpl";
const CONTENT_SLOT: &str = "{{CONTENT}}";

/// Helpers that templates can call while rendering
pub trait TemplateFunctions: Send + Sync {
    fn link_pages(&self, body: &[u8], base_url: &str) -> Markup;
    fn auto_index(&self, base_url: &str) -> Markup;
}

/// The wiki's helpers: bracket links and the page index
pub struct WikiFunctions {
    links: LinkRewriter,
    index: IndexBuilder,
}

impl WikiFunctions {
    pub fn new(links: LinkRewriter, index: IndexBuilder) -> Self {
        Self { links, index }
    }
}

impl TemplateFunctions for WikiFunctions {
    fn link_pages(&self, body: &[u8], base_url: &str) -> Markup {
        self.links.link_pages(body, base_url)
    }

    fn auto_index(&self, base_url: &str) -> Markup {
        self.index.auto_index(base_url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Title,
    Body,
    LinkedBody,
    Index,
    BaseUrl,
}

impl Slot {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "TITLE" => Some(Slot::Title),
            "BODY" => Some(Slot::Body),
            "LINKED_BODY" => Some(Slot::LinkedBody),
            "INDEX" => Some(Slot::Index),
            "BASE_URL" => Some(Slot::BaseUrl),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(Slot),
}

/// A layout-wrapped fragment, split into literal text and slots
#[derive(Debug, Clone)]
struct Template {
    segments: Vec<Segment>,
}

impl Template {
    fn parse(name: &str, source: &str) -> Result<Self, WikiError> {
        let mut segments = Vec::new();
        let mut rest = source;
        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start + 2..].find("}}") else {
                break;
            };
            let slot_name = rest[start + 2..start + 2 + len].trim();
            let slot = Slot::from_name(slot_name).ok_or_else(|| {
                WikiError::TemplateError(format!("{}: unknown slot {{{{{}}}}}", name, slot_name))
            })?;
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            segments.push(Segment::Slot(slot));
            rest = &rest[start + 2 + len + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }
        Ok(Self { segments })
    }

    fn execute(&self, page: &Page, base_url: &str, functions: &dyn TemplateFunctions) -> Vec<u8> {
        let mut out = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.extend_from_slice(text.as_bytes()),
                Segment::Slot(Slot::Title) => out.extend_from_slice(escape_html(&page.title).as_bytes()),
                Segment::Slot(Slot::Body) => out.extend_from_slice(&escape_html_bytes(&page.body)),
                Segment::Slot(Slot::LinkedBody) => {
                    out.extend_from_slice(functions.link_pages(&page.body, base_url).as_bytes())
                }
                Segment::Slot(Slot::Index) => {
                    out.extend_from_slice(functions.auto_index(base_url).as_bytes())
                }
                Segment::Slot(Slot::BaseUrl) => out.extend_from_slice(escape_attr(base_url).as_bytes()),
            }
        }
        out
    }
}

/// Pair every `*.tpl` fragment in `dir` with all `*.html` layouts in `dir`.
///
/// Each entry lists the layouts (sorted) followed by the fragment itself.
pub fn template_files(dir: &Path) -> Result<BTreeMap<String, Vec<PathBuf>>, WikiError> {
    let mut layouts = Vec::new();
    let mut fragments = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match path.extension().and_then(OsStr::to_str) {
            Some(LAYOUT_EXTENSION) => layouts.push(path),
            Some(FRAGMENT_EXTENSION) => fragments.push(path),
            _ => {}
        }
    }
    layouts.sort();

    let mut files = BTreeMap::new();
    for fragment in fragments {
        let Some(name) = fragment.file_name().and_then(OsStr::to_str).map(str::to_string) else {
            continue;
        };
        let mut set = layouts.clone();
        set.push(fragment);
        files.insert(name, set);
    }
    Ok(files)
}

/// Wrap the last file (the fragment) in the preceding layouts, outermost first
fn compose(name: &str, files: &[PathBuf]) -> Result<String, WikiError> {
    let Some((fragment, layouts)) = files.split_last() else {
        return Err(WikiError::TemplateError(format!("{}: no template files", name)));
    };
    let mut content = fs::read_to_string(fragment)?;
    for layout in layouts.iter().rev() {
        let source = fs::read_to_string(layout)?;
        if !source.contains(CONTENT_SLOT) {
            return Err(WikiError::TemplateError(format!(
                "{}: layout {:?} has no {} slot",
                name, layout, CONTENT_SLOT
            )));
        }
        content = source.replacen(CONTENT_SLOT, &content, 1);
    }
    Ok(content)
}

/// Named, pre-parsed templates plus the helpers they call
pub struct TemplateComponent {
    templates: HashMap<String, Template>,
    functions: Arc<dyn TemplateFunctions>,
}

impl TemplateComponent {
    /// Load every template in `dir`. Called once at startup.
    pub fn load(dir: &Path, functions: Arc<dyn TemplateFunctions>) -> Result<Self, WikiError> {
        let mut templates = HashMap::new();
        for (name, files) in template_files(dir)? {
            let source = compose(&name, &files)?;
            debug!("Loaded template {} from {:?}", name, files);
            templates.insert(name.clone(), Template::parse(&name, &source)?);
        }
        info!("Loaded {} templates from {:?}", templates.len(), dir);
        Ok(Self { templates, functions })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(&format!("{}.{}", name, FRAGMENT_EXTENSION))
    }

    /// Render template `name` (e.g. "view" for `view.tpl`) for `page`.
    ///
    /// Output is bytes because page bodies are copied into it verbatim.
    pub fn render(&self, name: &str, page: &Page, base_url: &str) -> Result<Vec<u8>, WikiError> {
        debug!("Executing template {} on {} with baseURL: {}", name, page.title, base_url);
        let key = format!("{}.{}", name, FRAGMENT_EXTENSION);
        let template = self.templates.get(&key).ok_or_else(|| {
            error!("Executing template {} on {}: no such template", name, page.title);
            WikiError::TemplateError(format!("template {:?} is not defined", key))
        })?;
        Ok(template.execute(page, base_url, self.functions.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubFunctions;

    impl TemplateFunctions for StubFunctions {
        fn link_pages(&self, body: &[u8], base_url: &str) -> Markup {
            Markup::new(format!("linked({},{})", String::from_utf8_lossy(body), base_url))
        }

        fn auto_index(&self, base_url: &str) -> Markup {
            Markup::new(format!("index({})", base_url))
        }
    }

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn template_files_pairs_fragments_with_layouts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "layout.html", "<html>{{CONTENT}}</html>");
        write(dir.path(), "template.tpl", "hi");
        write(dir.path(), "example.md", "content\n");

        let files = template_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files["template.tpl"], vec![dir.path().join("layout.html"), dir.path().join("template.tpl")]);
    }

    #[test]
    fn template_files_of_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(template_files(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn renders_slots_inside_layout() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "layout.html", "<title>{{TITLE}}</title>{{CONTENT}}");
        write(dir.path(), "view.tpl", "{{LINKED_BODY}}|{{INDEX}}|{{BASE_URL}}|{{BODY}}");
        let templates = TemplateComponent::load(dir.path(), Arc::new(StubFunctions)).unwrap();

        let html = templates.render("view", &Page::new("A<B", "x<y"), "//h/view/").unwrap();
        assert_eq!(html, b"<title>A&lt;B</title>linked(x<y,//h/view/)|index(//h/view/)|//h/view/|x&lt;y");
    }

    #[test]
    fn nested_layouts_wrap_outermost_first() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.html", "[a{{CONTENT}}]");
        write(dir.path(), "b.html", "(b{{CONTENT}})");
        write(dir.path(), "edit.tpl", "{{TITLE}}");
        let templates = TemplateComponent::load(dir.path(), Arc::new(StubFunctions)).unwrap();
        assert_eq!(templates.render("edit", &Page::empty("T"), "").unwrap(), b"[a(bT)]");
    }

    #[test]
    fn page_content_is_not_expanded_as_slots() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "edit.tpl", "{{BODY}}");
        let templates = TemplateComponent::load(dir.path(), Arc::new(StubFunctions)).unwrap();
        assert_eq!(templates.render("edit", &Page::new("T", "{{INDEX}}"), "").unwrap(), b"{{INDEX}}");
    }

    #[test]
    fn body_bytes_are_copied_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "edit.tpl", "<textarea>{{BODY}}</textarea>");
        let templates = TemplateComponent::load(dir.path(), Arc::new(StubFunctions)).unwrap();
        let html = templates.render("edit", &Page::new("T", b"x\xe9<y".to_vec()), "").unwrap();
        assert_eq!(html, b"<textarea>x\xe9&lt;y</textarea>");
    }

    #[test]
    fn unknown_slot_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "view.tpl", "{{NOPE}}");
        let err = TemplateComponent::load(dir.path(), Arc::new(StubFunctions)).err().unwrap();
        assert!(matches!(err, WikiError::TemplateError(_)));
    }

    #[test]
    fn layout_without_content_slot_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "layout.html", "<html></html>");
        write(dir.path(), "view.tpl", "x");
        assert!(TemplateComponent::load(dir.path(), Arc::new(StubFunctions)).is_err());
    }

    #[test]
    fn unknown_template_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "view.tpl", "x");
        let templates = TemplateComponent::load(dir.path(), Arc::new(StubFunctions)).unwrap();
        assert!(templates.contains("view"));
        let err = templates.render("edit", &Page::empty("T"), "").unwrap_err();
        assert!(matches!(err, WikiError::TemplateError(_)));
    }
}
