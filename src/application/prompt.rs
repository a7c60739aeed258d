//! Prompt construction for clinical question answering.

/// Instructions given to the model for every question.
pub const SYSTEM_PROMPT: &str = "You are a medical assistant specialized in analyzing clinical records.\n\
You must answer exclusively from the context provided.\n\
\n\
FORMATTING RULES:\n\
- Use Markdown.\n\
- Bold for dates, medications and diagnoses.\n\
- Numbered lists for events.\n\
- Bullet points for details.\n\
- Do not invent information.\n\
- Use ICD-10 codes when available.\n\
- Keep answers clear, ordered and chronological.\n";

/// Builds the user turn: retrieved context first, then the question.
pub fn user_message(question: &str, context: &str) -> String {
    format!(
        "CLINICAL CONTEXT:\n{context}\n\n\
         USER QUESTION:\n{question}\n\n\
         Answer using only the information in the context."
    )
}
