//! Prompt for context-constrained answer generation.

pub const NOT_FOUND_ANSWER: &str = "Information not found in the provided documents.";

pub fn answer_prompt(question: &str, context: &str) -> String {
    format!(
        r#"You are a policy assistant. Answer ONLY based on the context provided.

RULES:
1. Use ONLY the context below - no external knowledge
2. If the context doesn't have the answer, say: "{}"
3. Be clear and specific
4. Cite relevant sections if possible

Context:
{}

Question: {}

Answer:"#,
        NOT_FOUND_ANSWER, context, question
    )
}
