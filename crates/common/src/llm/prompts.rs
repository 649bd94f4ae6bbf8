//! Prompt templates
//!
//! Placeholders are `{name}`. Rendering substitutes in a single pass over the
//! template, so braces inside substituted values (JSON examples in retrieved
//! text, LaTeX) are never interpreted.

use super::{ChatMessage, ChatRole};

/// A named prompt with `{placeholder}` slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub template: &'static str,
}

impl PromptTemplate {
    pub const fn new(name: &'static str, template: &'static str) -> Self {
        Self { name, template }
    }

    /// Substitute `vars` into the template; unknown placeholders stay literal
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let template = self.template;
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let replaced = after.find('}').and_then(|close| {
                let key = &after[..close];
                vars.iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, value)| (*value, close))
            });

            match replaced {
                Some((value, close)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Render chat history as alternating `User:` / `Assistant:` lines
pub fn render_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|message| {
            let speaker = match message.role {
                ChatRole::User => "User",
                ChatRole::Assistant => "Assistant",
            };
            format!("{}: {}", speaker, message.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const EXPAND_QUERY: &str = r#"Expand this search query and propose 5 alternatives of the query to
maximize the recall. These queries will later be used by the application
to perform a fulltext search on INSPIRE HEP literature records.
Provide only a JSON object with a "terms" item that contains the array of
queries, without any explanation, introduction or comment.

Example of query:
how far are black holes?

Example of expanded query:
{"terms": ["how far are black holes", "distance to black holes", "distance to singularities", "distances to event horizon", "distance from Schwarzschild radius"]}

Query: {query}

Expanded query:
"#;

const GENERATE_ANSWER: &str = r#"You are part of a Retrieval Augmented Generation system and you are
provided with a query and a context of search results. Generate an answer
substantiated by the results provided. Cite the results using their index
in square brackets, for example [0]. Do not put two or more references
together (use [0][1] instead of [0,1]). Do not generate an answer that
cannot be entailed from the cited abstracts, so every paragraph must cite a
search result. Do not consider results that are not related to the query
and, if no specific answer can be provided, assert that in the brief answer.
Respond only with a JSON object with the fields "brief" (a short summary)
and "response" (the full answer, paragraphs separated by new lines).

<QUERY>{query}</QUERY>

<CONTEXT>
{context}
</CONTEXT>
"#;

const GENERATE_ANSWER_PLAYGROUND: &str = r#"You are part of a Retrieval Augmented Generation system and you are
provided with a query and a context of search results, each with numbered
snippets of full text. Generate an answer substantiated by the snippets.
Cite the supporting snippet as [result:snippet], for example [0:1] for
snippet 1 of result 0. Do not put two or more references together. Do not
include citations present in the retrieved text and do not mention the
notion of snippet in your response. Every paragraph must cite a snippet.
If no specific answer can be provided, assert that in the brief answer.
Respond only with a JSON object with the fields "brief" and "response".

<QUERY>{query}</QUERY>

<CONTEXT>
{context}
</CONTEXT>
"#;

const RAG_QUERY: &str = r#"You are a physics research assistant answering questions from excerpts
of INSPIRE HEP papers. Use only the documents below. Cite documents by
their number in square brackets, for example [1] for Document 1, and never
group citations as [1,2]. If the documents do not answer the question, say
so in the brief answer.
Respond only with a JSON object with the fields "brief" (one or two
sentences) and "response" (the detailed answer).

Question: {question}

Documents:
{context}
"#;

const RAG_PAPER_QUERY: &str = r#"You are a physics research assistant discussing a single INSPIRE HEP
paper with a user. Use only the excerpts of the paper below and the
conversation so far. Cite excerpts by their document number in square
brackets, for example [2]. If the excerpts do not answer the question, say
so.
Respond only with a JSON object with the field "response".

Conversation so far:
{history}

Question: {question}

Excerpts:
{context}
"#;

/// Prompt variants used by each model's chains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    pub expand_query: PromptTemplate,
    pub generate_answer: PromptTemplate,
    pub generate_answer_playground: PromptTemplate,
    pub rag_query: PromptTemplate,
    pub rag_paper_query: PromptTemplate,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            expand_query: PromptTemplate::new("expand-query", EXPAND_QUERY),
            generate_answer: PromptTemplate::new("generate-answer", GENERATE_ANSWER),
            generate_answer_playground: PromptTemplate::new(
                "generate-answer-playground",
                GENERATE_ANSWER_PLAYGROUND,
            ),
            rag_query: PromptTemplate::new("rag-query", RAG_QUERY),
            rag_paper_query: PromptTemplate::new("rag-paper-query", RAG_PAPER_QUERY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_once() {
        let template = PromptTemplate::new("t", "Q: {query} C: {context}");
        let rendered = template.render(&[("query", "{context}"), ("context", "ctx")]);
        assert_eq!(rendered, "Q: {context} C: ctx");
    }

    #[test]
    fn test_render_keeps_unknown_braces() {
        let template = PromptTemplate::new("t", r#"{"terms": []} {query} {"#);
        assert_eq!(template.render(&[("query", "x")]), r#"{"terms": []} x {"#);
    }

    #[test]
    fn test_default_prompts_have_slots() {
        let prompts = Prompts::default();
        assert!(prompts.expand_query.template.contains("{query}"));
        assert!(prompts.generate_answer.template.contains("{context}"));
        assert!(prompts.rag_query.template.contains("{question}"));
        assert!(prompts.rag_paper_query.template.contains("{history}"));
    }

    #[test]
    fn test_render_history() {
        let history = vec![
            ChatMessage { role: ChatRole::User, content: "What is it about?".into() },
            ChatMessage { role: ChatRole::Assistant, content: "Axions [1].".into() },
        ];
        assert_eq!(
            render_history(&history),
            "User: What is it about?\nAssistant: Axions [1]."
        );
        assert_eq!(render_history(&[]), "");
    }
}
