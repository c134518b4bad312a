// Centralized UI strings and labels. ASCII-friendly by default.

use unicode_width::UnicodeWidthStr;

// Minimal, space-efficient role prefixes (ASCII)
pub const PREFIX_USER: &str = "| ";
pub const PREFIX_ASSISTANT: &str = "> ";

pub const WELCOME: &str = "Welcome! Ask a question about your documents, or /upload <path> to add a PDF. Enter: send; Shift+Enter: newline; Ctrl-C: quit.";
pub const INPUT_HINT: &str = "Type your message...";

// UI block titles (keep surrounding spaces for visual padding)
pub const TITLE_CHAT: &str = " Chat ";
pub const TITLE_INPUT: &str = " Input ";

// Fixed reply shown when a chat request fails; any partial answer is discarded.
pub const ERROR_REPLY: &str = "Sorry, there was an error processing your request.";

// Upload flow messages
pub const SELECT_PDF: &str = "Please select a PDF file";
pub const UPLOAD_CONNECT_FAIL: &str = "Failed to upload PDF. Please check if the backend is running.";
pub const UPLOADED_NOTICE: &str = "PDF uploaded successfully! You can now ask questions about it.";
pub const UPLOAD_USAGE: &str = "usage: /upload <path-to-pdf>";

pub const BUSY_STREAMING: &str = "a reply is still streaming; wait or press Ctrl-C to cancel";
pub const BUSY_UPLOADING: &str = "an upload is already in flight";

pub fn upload_success(filename: &str) -> String {
    format!("Successfully uploaded: {}", filename)
}

pub fn uploading(name: &str) -> String {
    format!("Uploading {}...", name)
}

// Status bar stick label
pub const STICK_BOTTOM: &str = "Bottom";

pub fn build_stick_label(scroll: u16) -> String {
    if scroll == 0 {
        STICK_BOTTOM.to_string()
    } else {
        format!("+{} lines", scroll)
    }
}

// Build the status bar line with width-aware compaction: fixed segments
// first, hints appended while space allows.
#[allow(clippy::too_many_arguments)]
pub fn build_status_line(
    backend: &str,
    stick: &str,
    streaming: bool,
    selected_file: Option<&str>,
    upload: Option<&str>,
    notice: Option<&str>,
    history_len: usize,
    max_width: u16,
) -> String {
    let mut segments: Vec<String> = Vec::new();
    segments.push(format!("[{}]", backend));
    segments.push(format!("[{}]", stick));
    if streaming {
        segments.push("streaming...".to_string());
    }
    if let Some(name) = selected_file {
        segments.push(format!("File:{}", name));
    }
    if let Some(u) = upload {
        segments.push(u.to_string());
    }
    if let Some(n) = notice {
        segments.push(n.to_string());
    }
    segments.push(format!("Hist:{}", history_len));
    let hints: [&str; 5] = [
        "Enter: send; Shift+Enter: newline",
        "/upload <path>: send a PDF",
        "PgUp/PgDn: scroll",
        "History: Up/Down",
        "Ctrl-C: quit",
    ];
    for h in hints {
        segments.push(h.to_string());
    }

    let sep = "  |  ";
    let mut out = String::new();
    let mut used = 0usize;
    for (i, seg) in segments.iter().enumerate() {
        let segw = UnicodeWidthStr::width(seg.as_str());
        let addw = segw
            + if i == 0 {
                0
            } else {
                UnicodeWidthStr::width(sep)
            };
        if used + addw > max_width as usize {
            break;
        }
        if i > 0 {
            out.push_str(sep);
            used += UnicodeWidthStr::width(sep);
        }
        out.push_str(seg);
        used += segw;
    }
    out
}
