//! Locale-aware template lookup
//!
//! Templates live under the template directory, optionally inside a locale
//! subdirectory:
//!
//! ```text
//! {dir}/[{locale}/]subjects.xml          template name -> subject
//! {dir}/[{locale}/]{name}.{ext}          template body
//! {dir}/[{locale}/]{prefix}{name}.{ext}  outer (layout) template
//! ```
//!
//! Lookup walks the tiers specific locale, default locale, root; first hit wins.

use crate::domain::{ResolvedTemplate, MANIFEST_FILE};
use crate::error::{MailError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Template name -> subject text for one locale tier
pub type TemplateManifest = HashMap<String, String>;

/// Parse a `subjects.xml` manifest.
///
/// ```xml
/// <templates>
///     <contact><subject>Hello {{name}}</subject></contact>
/// </templates>
/// ```
pub fn parse_manifest(xml: &str) -> std::result::Result<TemplateManifest, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut manifest = TemplateManifest::new();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| e.to_string())?;
                push_subject(&mut manifest, &path, &text);
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data);
                push_subject(&mut manifest, &path, &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(manifest)
}

fn push_subject(manifest: &mut TemplateManifest, path: &[String], text: &str) {
    if let [root, template, field] = path {
        if root == "templates" && field == "subject" {
            manifest.entry(template.clone()).or_default().push_str(text);
        }
    }
}

/// Finds templates and out templates across locale tiers
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    template_dir: PathBuf,
    extension: String,
    outer_prefix: String,
}

impl TemplateResolver {
    pub fn new(
        template_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
        outer_prefix: impl Into<String>,
    ) -> Self {
        Self {
            template_dir: template_dir.into(),
            extension: extension.into(),
            outer_prefix: outer_prefix.into(),
        }
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Resolve a template and its subject: `locale`, then `default_locale`, then root.
    ///
    /// A manifest entry whose template file is missing counts as a miss for that
    /// tier and the search continues.
    pub fn resolve(
        &self,
        name: &str,
        locale: &str,
        default_locale: &str,
    ) -> Result<ResolvedTemplate> {
        for tier in tiers(locale, default_locale) {
            if let Some(resolved) = self.resolve_in(name, tier) {
                debug!(template = name, tier, "Resolved email template");
                return Ok(resolved);
            }
            debug!(template = name, tier, "Email template not in tier");
        }

        Err(MailError::TemplateNotFound(name.to_string()))
    }

    /// Resolve an out template (`{prefix}{name}`); file existence only, no subject.
    pub fn resolve_outer(&self, name: &str, locale: &str, default_locale: &str) -> Option<String> {
        let file_name = format!("{}{}", self.outer_prefix, name);

        tiers(locale, default_locale)
            .into_iter()
            .map(|tier| qualify(tier, &file_name))
            .find(|template| self.file_path(template).is_file())
    }

    /// Load the manifest of one tier; missing, empty or broken manifests yield `None`
    pub fn load_manifest(&self, locale: &str) -> Option<TemplateManifest> {
        let path = self.tier_dir(locale).join(MANIFEST_FILE);

        let xml = std::fs::read_to_string(&path).ok()?;
        if xml.trim().is_empty() {
            return None;
        }

        match parse_manifest(&xml) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable subjects manifest");
                None
            }
        }
    }

    fn resolve_in(&self, name: &str, locale: &str) -> Option<ResolvedTemplate> {
        let manifest = self.load_manifest(locale)?;
        let subject = manifest.get(name)?;

        let template = qualify(locale, name);
        if !self.file_path(&template).is_file() {
            return None;
        }

        Some(ResolvedTemplate {
            subject: subject.clone(),
            template,
        })
    }

    fn tier_dir(&self, locale: &str) -> PathBuf {
        if locale.is_empty() {
            self.template_dir.clone()
        } else {
            self.template_dir.join(locale)
        }
    }

    fn file_path(&self, template: &str) -> PathBuf {
        self.template_dir
            .join(format!("{}.{}", template, self.extension))
    }
}

/// Lookup order; blank locales are skipped, root always comes last
fn tiers<'a>(locale: &'a str, default_locale: &'a str) -> Vec<&'a str> {
    let mut tiers = Vec::with_capacity(3);
    for tier in [locale.trim(), default_locale.trim()] {
        if !tier.is_empty() && !tiers.contains(&tier) {
            tiers.push(tier);
        }
    }
    tiers.push("");
    tiers
}

fn qualify(locale: &str, name: &str) -> String {
    if locale.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", locale, name)
    }
}
