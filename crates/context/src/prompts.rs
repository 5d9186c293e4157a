//! Prompt templates
//!
//! Llama-3 chat-template text rendered by hand. The grounding prompt
//! instructs the model to cite the arXiv ids of the documents it used
//! so the session can resolve them against the graph afterwards.

const INITIAL_TEMPLATE: &str = r#"<|start_header_id|>system<|end_header_id|>
You are an AI language model designed to assist with retrieval-augmented generation tasks. Your job is to provide detailed, accurate, and contextually relevant information by leveraging external knowledge sources.
<|eot_id|><|start_header_id|>user<|end_header_id|>
Use natural language and be concise.
Return the Document arXiv ID for the Document used to answer the question. Return the arXiv ID between square brackets prefixed with "arXiv:". For example, if the arXiv ID is 1234.56789, return [arXiv:1234.56789].
If multiple documents are used to generate the answer, return the arXiv IDs separated by commas. For example, if the arXiv IDs are 1234.56789, 6711.03217 and 4512.09876, return [arXiv:1234.56789, arXiv:6711.03217, arXiv:4512.09876].
First state the arXiv ID and then answer the question.
Say that you don't know the answer if you don't find it in the context.
Answer the question based only on the following context.:
Context: {context}

Question: {question}
Try to combine information from multiple documents to answer the question.
<|eot_id|><|start_header_id|>assistant<|end_header_id|>
"#;

const FOLLOWUP_TEMPLATE: &str = r#"<|start_header_id|>system<|end_header_id|>
You are an AI language model designed to present the information provided to you in a more readable format and concise manner.
You need to provide the following information from all the papers provided in the context:
1. Paper Title
2. Related Papers
3. Top Authors
4. Summarization of the Paper Summary in 2 lines.
<|eot_id|><|start_header_id|>user<|end_header_id|>
Here are the papers for which you need to provide the information(Context):
{context}

Instruction: Please provide the asked information about the papers in the context.
<|eot_id|><|start_header_id|>assistant<|end_header_id|>
"#;

/// Render the grounded question prompt
pub fn render_initial(bos_token: &str, context: &str, question: &str) -> String {
    let body = INITIAL_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question);
    format!("{bos_token}{body}")
}

/// Render the follow-up paper summary prompt
pub fn render_followup(bos_token: &str, context: &str) -> String {
    let body = FOLLOWUP_TEMPLATE.replace("{context}", context);
    format!("{bos_token}{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_substitutes_both_placeholders() {
        let prompt = render_initial("<|begin_of_text|>", "CTX-BODY", "What is attention?");
        assert!(prompt.starts_with("<|begin_of_text|>"));
        assert!(prompt.contains("Context: CTX-BODY"));
        assert!(prompt.contains("Question: What is attention?"));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{question}"));
    }

    #[test]
    fn test_initial_asks_for_bracketed_ids() {
        let prompt = render_initial("", "", "");
        assert!(prompt.contains("[arXiv:1234.56789]"));
    }

    #[test]
    fn test_followup_substitutes_context() {
        let prompt = render_followup("BOS", "PAPER-INFO");
        assert!(prompt.starts_with("BOS"));
        assert!(prompt.contains("PAPER-INFO"));
        assert!(!prompt.contains("{context}"));
    }
}
