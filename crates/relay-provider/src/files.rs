//! Inline file context for chat-completion prompts.
//!
//! Attachments arrive base64-encoded; they are decoded as UTF-8 text and
//! rendered as a numbered block placed ahead of the message they belong to.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use relay_core::types::FileAttachment;

use crate::error::ProviderError;

const FILE_CONTEXT_HEADER: &str = "File content to use as context:\n\n";

/// Render attachments as a context block. Empty input renders as `""`.
///
/// Any attachment that is not valid base64 or not valid UTF-8 fails the
/// whole block.
pub fn files_to_context(files: &[FileAttachment]) -> Result<String, ProviderError> {
    if files.is_empty() {
        return Ok(String::new());
    }

    let mut block = String::from(FILE_CONTEXT_HEADER);
    for (i, file) in files.iter().enumerate() {
        let bytes = STANDARD.decode(file.base64.trim()).map_err(|e| {
            ProviderError::Attachment(format!("{}: invalid base64: {}", file.name, e))
        })?;
        let text = String::from_utf8(bytes).map_err(|e| {
            ProviderError::Attachment(format!("{}: not UTF-8 text: {}", file.name, e))
        })?;
        block.push_str(&format!("{}. {}:\n\n{}\n\n", i + 1, file.name, text));
    }
    Ok(block)
}

/// Prepend the rendered attachments to `content`.
pub fn with_file_context(files: &[FileAttachment], content: &str) -> Result<String, ProviderError> {
    let block = files_to_context(files)?;
    if block.is_empty() {
        Ok(content.to_string())
    } else {
        Ok(format!("{}\n\n{}", block, content))
    }
}
