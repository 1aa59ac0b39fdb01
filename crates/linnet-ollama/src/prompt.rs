// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembles the single prompt string sent to the model.

use linnet_core::InferenceRequest;

/// Combines the question with whatever context the request carries.
///
/// Sections appear in a fixed order: the question, the referenced (quoted)
/// message, the recent conversation, then web search results. Absent
/// sections are left out entirely.
pub fn build_prompt(request: &InferenceRequest) -> String {
    let mut parts = vec![format!("User's question: {}", request.prompt)];

    if let Some(quoted) = present(&request.context_text) {
        parts.extend([
            String::new(),
            "Referenced message:".to_string(),
            "---".to_string(),
            quoted.to_string(),
            "---".to_string(),
        ]);
    }

    if let Some(history) = present(&request.conversation_history) {
        parts.extend([
            String::new(),
            "Recent conversation:".to_string(),
            "---".to_string(),
            history.to_string(),
            "---".to_string(),
        ]);
    }

    if let Some(results) = present(&request.search_results) {
        parts.extend([
            String::new(),
            "web search:".to_string(),
            results.to_string(),
        ]);
    }

    parts.join("\n")
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
