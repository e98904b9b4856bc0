use crate::error::ExtractError;
use lopdf::Document;
use std::path::Path;

const TEXT_EXTENSIONS: [&str; 9] = ["txt", "md", "js", "py", "java", "c", "cpp", "html", "css"];

pub fn is_supported(path: &Path) -> bool {
    let extension = file_extension(path);
    extension == "pdf" || TEXT_EXTENSIONS.contains(&extension.as_str())
}

/// Maps a file extension to the stored `fileType` tag.
pub fn file_type_tag(path: &Path) -> String {
    match file_extension(path).as_str() {
        "pdf" => "application/pdf".to_string(),
        "md" => "text/markdown".to_string(),
        "html" => "text/html".to_string(),
        _ => "text/plain".to_string(),
    }
}

/// Extracts plain text from a document on disk, dispatching on extension.
/// PDF pages are joined by blank lines so the chunker sees page breaks as
/// paragraph boundaries.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let extension = file_extension(path);

    if extension == "pdf" {
        extract_pdf_text(path)
    } else if TEXT_EXTENSIONS.contains(&extension.as_str()) {
        Ok(std::fs::read_to_string(path)?)
    } else {
        Err(ExtractError::UnsupportedType(format!(
            "{} ({})",
            path.display(),
            if extension.is_empty() {
                "no extension"
            } else {
                extension.as_str()
            }
        )))
    }
}

pub fn extract_pdf_text(path: &Path) -> Result<String, ExtractError> {
    let document =
        Document::load(path).map_err(|error| ExtractError::PdfParse(error.to_string()))?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| ExtractError::PdfParse(error.to_string()))?;

        if !text.trim().is_empty() {
            pages.push(text.trim().to_string());
        }
    }

    if pages.is_empty() {
        return Err(ExtractError::PdfParse(format!(
            "pdf had no readable page text: {}",
            path.display()
        )));
    }

    Ok(pages.join("\n\n"))
}

fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase())
        .unwrap_or_default()
}
