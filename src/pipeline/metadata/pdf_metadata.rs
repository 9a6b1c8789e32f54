use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::base_metadata::{yaml_sidecar_path, MetadataWriter};
use crate::data_model::DocumentInfo;
use crate::error::{PipelineError, Result};
use crate::utils::temp_sibling;

pub const TAX_KEYWORD: &str = "Steuerrelevant";

/// Writes the Info dictionary with `lopdf` and a YAML sidecar with `serde_yaml`.
#[derive(Debug, Clone, Default)]
pub struct PdfMetadataWriter;

impl PdfMetadataWriter {
    pub fn new() -> Self {
        PdfMetadataWriter
    }
}

#[derive(Serialize, Debug)]
struct SidecarRecord<'a> {
    title: &'a str,
    subject: &'a str,
    issuer: &'a str,
    summary: &'a str,
    date: Option<String>,
    tax_relevant: bool,
    source_file: String,
    processed_at: String,
}

/// PDF text string: literal for ASCII, UTF-16BE with a byte order mark otherwise.
fn pdf_text(value: &str) -> Object {
    if value.is_ascii() {
        return Object::String(value.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn pdf_date(date: NaiveDate) -> Object {
    Object::String(
        date.format("D:%Y%m%d").to_string().into_bytes(),
        StringFormat::Literal,
    )
}

/// Resolves the trailer's Info dictionary, creating one when it is absent.
fn info_dictionary_mut(doc: &mut Document) -> Result<&mut Dictionary> {
    let existing = doc
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .ok();
    let id = match existing {
        Some(id) if doc.get_dictionary(id).is_ok() => id,
        _ => {
            let id = doc.add_object(Dictionary::new());
            doc.trailer.set("Info", Object::Reference(id));
            id
        }
    };
    Ok(doc.get_object_mut(id)?.as_dict_mut()?)
}

fn apply_info(doc: &mut Document, info: &DocumentInfo) -> Result<()> {
    let dict = info_dictionary_mut(doc)?;
    dict.set("Title", pdf_text(&info.title));
    dict.set("Subject", pdf_text(&info.subject));
    dict.set("Author", pdf_text(&info.issuer));
    if info.tax_relevant {
        dict.set("Keywords", pdf_text(TAX_KEYWORD));
    } else {
        dict.remove(b"Keywords");
    }
    if let Some(date) = info.date {
        dict.set("CreationDate", pdf_date(date));
    }
    Ok(())
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn lang_alt(name: &str, value: &str) -> String {
    format!(
        "   <dc:{name}><rdf:Alt><rdf:li xml:lang=\"x-default\">{}</rdf:li></rdf:Alt></dc:{name}>\n",
        escape_xml(value)
    )
}

/// XMP packet carrying the Dublin Core fields, including the summary as
/// `dc:description`, which the Info dictionary has no key for.
fn xmp_packet(info: &DocumentInfo) -> String {
    let mut body = String::new();
    body.push_str(&lang_alt("title", &info.title));
    body.push_str(&lang_alt("subject", &info.subject));
    body.push_str(&lang_alt("description", &info.summary));
    body.push_str(&format!(
        "   <dc:creator><rdf:Seq><rdf:li>{}</rdf:li></rdf:Seq></dc:creator>\n",
        escape_xml(&info.issuer)
    ));
    if let Some(date) = info.date {
        body.push_str(&format!("   <dc:date>{}</dc:date>\n", date.format("%Y-%m-%d")));
    }
    if info.tax_relevant {
        body.push_str(&format!("   <xmp:Label>{}</xmp:Label>\n", TAX_KEYWORD));
    }
    format!(
        "<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n\
         <x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\n\
         <rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n\
         <rdf:Description rdf:about=\"\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
         xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\">\n\
         {body}\
         </rdf:Description>\n\
         </rdf:RDF>\n\
         </x:xmpmeta>\n\
         <?xpacket end=\"w\"?>\n"
    )
}

/// Replaces the catalog's `/Metadata` stream with a fresh XMP packet.
fn apply_xmp(doc: &mut Document, info: &DocumentInfo) -> Result<()> {
    let stream = Stream::new(
        dictionary! {
            "Type" => "Metadata",
            "Subtype" => "XML",
        },
        xmp_packet(info).into_bytes(),
    );
    let metadata_id = doc.add_object(stream);
    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    doc.get_object_mut(root_id)?
        .as_dict_mut()?
        .set("Metadata", Object::Reference(metadata_id));
    Ok(())
}

fn update_pdf(path: &Path, info: &DocumentInfo) -> Result<()> {
    let mut doc = Document::load(path)?;
    apply_info(&mut doc, info)?;
    apply_xmp(&mut doc, info)?;

    // Save beside the original, then swap, so a failed write leaves the input intact.
    let tmp_path = temp_sibling(path, "meta-tmp");
    if let Err(e) = doc.save(&tmp_path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[async_trait]
impl MetadataWriter for PdfMetadataWriter {
    fn name(&self) -> &'static str {
        "pdf-metadata"
    }

    async fn update_embedded(&self, path: &Path, info: &DocumentInfo) -> Result<()> {
        debug!(path = %path.display(), "Writing embedded PDF metadata");
        let path_buf = path.to_path_buf();
        let info = info.clone();
        tokio::task::spawn_blocking(move || update_pdf(&path_buf, &info))
            .await
            .map_err(|e| PipelineError::Unexpected(format!("metadata task failed: {}", e)))?
    }

    async fn write_sidecar(&self, path: &Path, info: &DocumentInfo) -> Result<PathBuf> {
        let sidecar = yaml_sidecar_path(path);
        let record = SidecarRecord {
            title: &info.title,
            subject: &info.subject,
            issuer: &info.issuer,
            summary: &info.summary,
            date: info.date.map(|d| d.format("%Y-%m-%d").to_string()),
            tax_relevant: info.tax_relevant,
            source_file: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            processed_at: Local::now().to_rfc3339(),
        };
        let yaml = serde_yaml::to_string(&record)?;
        tokio::fs::write(&sidecar, yaml).await?;
        info!(sidecar = %sidecar.display(), "Sidecar written");
        Ok(sidecar)
    }
}
