pub mod templates;

pub use templates::{template_files, TemplateComponent, TemplateFunctions, WikiFunctions};
