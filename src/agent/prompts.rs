//! Prompt templates for the query pipeline.

use crate::core::llm::ChatMessage;

pub const SYSTEM_PROMPT: &str = "You are a mutual fund expert advisor specialized in Indian mutual funds.
Your role is to analyze fund data and provide insights and recommendations based on users' queries.
Always provide balanced, factual information based on the data available.
When comparing funds, consider factors like performance, risk, expense ratio, and fund category.";

const QUERY_ANALYSIS_INSTRUCTION: &str = "Analyze this query about mutual funds. Extract the key information:
1. What specific funds are mentioned (if any)?
2. What information is the user looking for (performance, comparison, recommendations, etc.)?
3. What time period is relevant (if mentioned)?
4. Any specific criteria mentioned (risk level, fund size, fund house, etc.)?

Provide your analysis in a structured format.";

const FUND_SEARCH_INSTRUCTION: &str = "Based on the user query, what search terms should be used to find relevant mutual funds?
Generate 1-3 search terms that would be most effective for finding the funds the user is interested in.
Return a list of search terms in the format: [\"term1\", \"term2\", \"term3\"]";

/// Stage 1: extract fund names and intent from the raw query.
pub fn query_analysis(query: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(query),
        ChatMessage::system(QUERY_ANALYSIS_INSTRUCTION),
    ]
}

/// Stage 2 fallback: propose search terms when no fund was named.
pub fn fund_search(query: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(query)];
    messages.extend_from_slice(history);
    messages.push(ChatMessage::system(FUND_SEARCH_INSTRUCTION));
    messages
}

/// Stage 4: single-fund analysis over one serialized fund record.
pub fn fund_analysis(query: &str, history: &[ChatMessage], fund_data: &str) -> Vec<ChatMessage> {
    let instruction = format!(
        "Analyze the following fund data to answer the user's query:

Fund Information:
{fund_data}

Provide a comprehensive analysis including:
1. Fund overview and category
2. Performance analysis
3. Risk assessment
4. Relevant insights
5. Recommendations based on the user's query

Be specific and data-driven in your analysis."
    );
    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(query)];
    messages.extend_from_slice(history);
    messages.push(ChatMessage::system(instruction));
    messages
}

/// Stage 4: comparison over the first two serialized fund records.
pub fn fund_comparison(
    query: &str,
    history: &[ChatMessage],
    fund_data_1: &str,
    fund_data_2: &str,
) -> Vec<ChatMessage> {
    let instruction = format!(
        "Compare the following funds based on the user query:

Fund 1:
{fund_data_1}

Fund 2:
{fund_data_2}

Provide a comprehensive comparison including:
1. Performance comparison across different time periods
2. Risk assessment comparison
3. Fund characteristics comparison
4. Advantages and disadvantages of each fund
5. Recommendation based on the query

Be balanced and objective in your comparison."
    );
    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(query)];
    messages.extend_from_slice(history);
    messages.push(ChatMessage::system(instruction));
    messages
}

/// Stage 5: compose the final answer from the gathered analysis.
pub fn final_response(query: &str, history: &[ChatMessage], context: &str) -> Vec<ChatMessage> {
    let instruction = format!(
        "Based on all the information gathered:

{context}

Provide a comprehensive, well-structured response to the user's query. Include relevant fund data, insights, and recommendations.
Ensure your response is balanced, factual, and tailored to the user's specific questions."
    );
    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(query)];
    messages.extend_from_slice(history);
    messages.push(ChatMessage::system(instruction));
    messages
}
