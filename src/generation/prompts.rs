//! Fixed instruction templates for each generation stage
use crate::generation::PromptTemplate;

/// Root-cause extraction: explain the underlying issue, no solution
pub const ROOT_CAUSE_PROMPT: PromptTemplate = PromptTemplate {
    name: "root_cause",
    system: "You are an expert analyst.",
    body: "Based on the following retrieved documents from our knowledge base, \
identify the most likely underlying problem, question, or root cause behind the user's original query. \
Explain the core issue according to the provided documents in about 10 lines. Do not provide a solution.\n\n\
Retrieved Documents:\n{context}\n\n\
User's Original Query:\n{question}\n\n\
Root Cause Analysis based on Documents:",
    variables: &["context", "question"],
};

/// Solution finding: concise technical answer grounded in the documents
pub const SOLUTION_PROMPT: PromptTemplate = PromptTemplate {
    name: "solution",
    system: "You are a helpful assistant knowledgeable in programming, particularly topics covered in \
Stack Overflow and MATLAB documentation.",
    body: "Use the following retrieved excerpts and your knowledge to answer the user's question \
concisely in about 20-25 lines.\n\n\
Retrieved Documents:\n{context}\n\n\
User's Question:\n{question}\n\n\
Answer based on Documents:",
    variables: &["context", "question"],
};

/// One step of the web-research reasoning loop
///
/// The model either requests a search with a single `SEARCH: <query>` line or
/// writes its final multi-source summary.
pub const WEB_AGENT_PROMPT: PromptTemplate = PromptTemplate {
    name: "web_agent",
    system: "You are an AI research assistant with access to a web search tool. \
To search the web, reply with exactly one line of the form:\n\
SEARCH: <search query>\n\
When the gathered results are sufficient, reply instead with a concise summary in about \
15-20 lines that directly answers the user's query based on the information retrieved.",
    body: "User's Query:\n{question}\n\n\
Research so far:\n{transcript}\n\n\
Your next reply (a SEARCH: line or the final summary):",
    variables: &["question", "transcript"],
};

/// Final synthesis: merge stage outputs into a structured Markdown report
pub const SYNTHESIS_PROMPT: PromptTemplate = PromptTemplate {
    name: "synthesis",
    system: "You are an expert technical analyst synthesizing information from internal analysis \
(root cause, potential solutions) and web research findings into a comprehensive report for the user. \
Generate the report in Markdown format. Structure the report clearly using the following headings:\n\
1. **Problem Description**\n\
2. **Root Cause Analysis**\n\
3. **Proposed Solution / Findings**\n\n\
Combine insights from the internal knowledge base solution and the web search results for the \
'Proposed Solution / Findings' section. Provide clear, actionable explanations. If findings \
conflict, acknowledge it and offer the most plausible interpretation based on the evidence. \
If information for any section is unavailable (indicated by messages like 'No root cause analysis \
available.'), clearly state this under the relevant heading.",
    body: "Please synthesize a final report in Markdown format based on the following information \
gathered for the user's query:\n\n\
--- INPUTS ---\n\n\
**Original User Query:**\n{query}\n\n\
**Internal Root Cause Analysis:**\n{root_cause}\n\n\
**Internal Knowledge Base Solution Suggestion:**\n{solution}\n\n\
**Web Search Findings:**\n{web_findings}\n\n\
--- END INPUTS ---\n\n\
**Comprehensive Report (Markdown Format):**",
    variables: &["query", "root_cause", "solution", "web_findings"],
};
