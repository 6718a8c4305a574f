use encoder::EmbeddingVector;
use serde::Serialize;
use std::fmt::Write as _;

/// Pseudo-field carrying the relevance score of a hit.
pub const SCORE_FIELD: &str = "score";

/// One weighted k-nearest-neighbour term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityTerm {
    pub field: String,
    pub vector: EmbeddingVector,
    pub top_k: usize,
    pub boost: f32,
}

/// A single alternative inside [`FilterPredicate::AnyOf`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextMatch {
    /// Token appears anywhere in the field.
    Substring { token: String },
    /// Token matches within `max_edits` character edits.
    Fuzzy { token: String, max_edits: u8 },
}

/// Hard filter; a document must satisfy every predicate of a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterPredicate {
    Exact { field: String, value: String },
    AnyOf { field: String, matches: Vec<TextMatch> },
    /// Relevance strictly greater than `threshold`.
    ScoreAbove { threshold: f32 },
}

/// Store-ready query produced by [`QueryCompiler`](crate::QueryCompiler).
///
/// Similarity terms are summed into one relevance score; filters are ANDed.
/// Values are only reachable through getters, so a compiled query cannot be
/// altered after it leaves the compiler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    terms: Vec<SimilarityTerm>,
    filters: Vec<FilterPredicate>,
    result_fields: Vec<String>,
    id_field: String,
    page_size: usize,
}

impl CompiledQuery {
    pub(crate) fn new(
        terms: Vec<SimilarityTerm>,
        filters: Vec<FilterPredicate>,
        result_fields: Vec<String>,
        id_field: String,
        page_size: usize,
    ) -> Self {
        Self {
            terms,
            filters,
            result_fields,
            id_field,
            page_size,
        }
    }

    pub fn terms(&self) -> &[SimilarityTerm] {
        &self.terms
    }

    pub fn filters(&self) -> &[FilterPredicate] {
        &self.filters
    }

    pub fn result_fields(&self) -> &[String] {
        &self.result_fields
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fields fetched from the store: the declared result fields plus the id
    /// field and `score`, which every ranked hit needs.
    pub fn projection(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::with_capacity(self.result_fields.len() + 2);
        let required = [self.id_field.as_str(), SCORE_FIELD];
        for name in self.result_fields.iter().map(String::as_str).chain(required) {
            if !fields.contains(&name) {
                fields.push(name);
            }
        }
        fields
    }

    /// Render as Solr request parameters, in a stable order.
    ///
    /// Each term becomes a `knn` sub-query wrapped in a `boost`, and the terms
    /// are combined with the `bool` parser's `should` clauses so their scores
    /// add up:
    ///
    /// ```text
    /// q  = {!bool should=$t0 should=$t1}
    /// t0 = {!boost b=4 v=$v0}
    /// v0 = {!knn f=work_experience_job_titles_embedding topK=50}[0.1,0.2,...]
    /// fq = work_experience_seniority:"senior"
    /// fq = (contact_information_address:*Lahore*)
    /// fq = {!frange l=1.01 incl=false}query($q)
    /// ```
    ///
    /// Field names were validated by the compiler and vectors only hold finite
    /// floats; filter literals are escaped here.
    pub fn to_solr_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.terms.len() * 2 + self.filters.len() + 4);

        let mut q = String::from("{!bool");
        for idx in 0..self.terms.len() {
            let _ = write!(q, " should=$t{idx}");
        }
        q.push('}');
        params.push(("q".to_string(), q));

        for (idx, term) in self.terms.iter().enumerate() {
            params.push((
                format!("t{idx}"),
                format!("{{!boost b={} v=$v{idx}}}", term.boost),
            ));
            params.push((
                format!("v{idx}"),
                format!(
                    "{{!knn f={} topK={}}}{}",
                    term.field,
                    term.top_k,
                    render_vector(term.vector.as_slice())
                ),
            ));
        }

        for filter in &self.filters {
            params.push(("fq".to_string(), render_filter(filter)));
        }

        params.push(("fl".to_string(), self.projection().join(",")));
        params.push(("rows".to_string(), self.page_size.to_string()));
        params.push(("wt".to_string(), "json".to_string()));
        params
    }
}

fn render_vector(values: &[f32]) -> String {
    let mut out = String::with_capacity(values.len() * 10 + 2);
    out.push('[');
    for (idx, v) in values.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        let _ = write!(out, "{v}");
    }
    out.push(']');
    out
}

fn render_filter(filter: &FilterPredicate) -> String {
    match filter {
        FilterPredicate::Exact { field, value } => {
            format!("{field}:\"{}\"", escape_phrase(value))
        }
        FilterPredicate::AnyOf { field, matches } => {
            let clauses: Vec<String> = matches
                .iter()
                .map(|m| match m {
                    TextMatch::Substring { token } => {
                        format!("{field}:*{}*", escape_term(token))
                    }
                    TextMatch::Fuzzy { token, max_edits } => {
                        format!("{field}:{}~{max_edits}", escape_term(token))
                    }
                })
                .collect();
            format!("({})", clauses.join(" OR "))
        }
        FilterPredicate::ScoreAbove { threshold } => {
            format!("{{!frange l={threshold} incl=false}}query($q)")
        }
    }
}

/// Escape a literal for use inside a double-quoted Lucene phrase.
pub(crate) fn escape_phrase(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a bare Lucene term: every query-syntax character and whitespace.
pub(crate) fn escape_term(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        if c.is_whitespace()
            || matches!(
                c,
                '\\' | '+'
                    | '-'
                    | '!'
                    | '('
                    | ')'
                    | ':'
                    | '^'
                    | '['
                    | ']'
                    | '"'
                    | '{'
                    | '}'
                    | '~'
                    | '*'
                    | '?'
                    | '|'
                    | '&'
                    | '/'
            )
        {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
