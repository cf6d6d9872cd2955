//! Query parser for the classic query-string syntax.
//!
//! Supported syntax:
//! - Terms on the default field: `hello`
//! - Field-specific terms: `title:hello`, grouped: `title:(hello world)`
//! - Phrases: `"hello world"`
//! - Modifiers: `+required -forbidden !forbidden NOT forbidden`
//! - Conjunctions: `a AND b`, `a OR b`, `a && b`, `a || b`
//! - Grouping: `(a OR b) AND c`
//! - Prefix and wildcard terms: `te*`, `t?st`
//! - Ranges: `[a TO b]` inclusive, `{a TO b}` exclusive, `*` for an open end
//! - Boosts: `term^2`, `(a b)^0.5`
//! - Match all: `*:*`
//! - Backslash escapes: `a\:b`, `c\+\+`

use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::Arc;

use ahash::AHashSet;

use crate::analysis::Analyzer;
use crate::document::{ALL_FIELD, DOC_ID_FIELD, UNTOKENIZED_SUFFIX};
use crate::error::{PaviseError, Result};
use crate::query::all::MatchAllQuery;
use crate::query::boolean::{BooleanClause, BooleanQuery, Occur};
use crate::query::multi_term::PrefixQuery;
use crate::query::phrase::PhraseQuery;
use crate::query::query::Query;
use crate::query::range::RangeQuery;
use crate::query::term::TermQuery;
use crate::query::wildcard::WildcardQuery;

/// How adjacent clauses without a conjunction combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Operator {
    /// Clauses are optional; at least one must match.
    #[default]
    Or,
    /// Clauses are required.
    And,
}

/// Parses query strings into query trees.
///
/// Terms aimed at tokenized fields go through the analyzer so they match
/// what was indexed. Untokenized fields (`_docID`, `*_untokenized` and any
/// registered with [`QueryParser::with_untokenized_fields`]) match verbatim.
#[derive(Clone)]
pub struct QueryParser {
    default_field: String,
    analyzer: Arc<dyn Analyzer>,
    untokenized_fields: AHashSet<String>,
    default_operator: Operator,
}

impl std::fmt::Debug for QueryParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryParser")
            .field("default_field", &self.default_field)
            .field("analyzer", &self.analyzer.name())
            .field("untokenized_fields", &self.untokenized_fields)
            .field("default_operator", &self.default_operator)
            .finish()
    }
}

impl QueryParser {
    /// Create a parser searching `allfield` by default.
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        QueryParser {
            default_field: ALL_FIELD.to_string(),
            analyzer,
            untokenized_fields: AHashSet::new(),
            default_operator: Operator::Or,
        }
    }

    /// Set the default field to search in when no field is specified.
    pub fn with_default_field<S: Into<String>>(mut self, field: S) -> Self {
        self.default_field = field.into();
        self
    }

    /// Declare fields whose values were indexed verbatim.
    pub fn with_untokenized_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.untokenized_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Set how clauses without a conjunction combine.
    pub fn with_default_operator(mut self, operator: Operator) -> Self {
        self.default_operator = operator;
        self
    }

    /// Get the default field.
    pub fn default_field(&self) -> &str {
        &self.default_field
    }

    /// Whether a field's terms match verbatim.
    pub fn is_untokenized(&self, field: &str) -> bool {
        field == DOC_ID_FIELD
            || field.ends_with(UNTOKENIZED_SUFFIX)
            || self.untokenized_fields.contains(field)
    }

    /// Parse a query string into a Query object.
    ///
    /// A query whose terms all analyze away (only stop words, say) becomes
    /// an empty boolean query, which matches nothing.
    pub fn parse(&self, query_str: &str) -> Result<Box<dyn Query>> {
        if query_str.trim().is_empty() {
            return Err(PaviseError::bad_query("Empty query"));
        }

        let tokens = Lexer::new(query_str).tokenize()?;
        let mut parser = QueryStringParser {
            parser: self,
            tokens,
            pos: 0,
        };

        let query = parser.parse_query(&self.default_field)?;
        if let Some(token) = parser.peek() {
            return Err(PaviseError::bad_query(format!(
                "Unexpected {} in query '{query_str}'",
                token.describe()
            )));
        }

        Ok(query.unwrap_or_else(|| Box::new(BooleanQuery::new())))
    }

    fn analyzed_terms(&self, text: &str) -> Result<Vec<(u32, String)>> {
        Ok(self
            .analyzer
            .analyze(text)?
            .filter(|token| !token.is_stopped())
            .map(|token| (token.position as u32, token.text))
            .collect())
    }

    fn normalize(&self, field: &str, text: &str) -> String {
        if self.is_untokenized(field) {
            text.to_string()
        } else {
            text.to_lowercase()
        }
    }
}

/// A bare word, with each character flagged as escaped or not.
#[derive(Clone, Debug, PartialEq)]
struct Word(Vec<(char, bool)>);

impl Word {
    fn text(&self) -> String {
        self.0.iter().map(|(ch, _)| ch).collect()
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        self.0.len() == keyword.chars().count()
            && self
                .0
                .iter()
                .zip(keyword.chars())
                .all(|(&(ch, escaped), k)| !escaped && ch == k)
    }

    fn is_wildcard(&(ch, escaped): &(char, bool)) -> bool {
        !escaped && (ch == '*' || ch == '?')
    }

    fn has_wildcard(&self) -> bool {
        self.0.iter().any(Self::is_wildcard)
    }

    /// The literal prefix when the only wildcard is one trailing `*`.
    fn as_prefix(&self) -> Option<String> {
        let (last, rest) = self.0.split_last()?;
        if *last == ('*', false) && !rest.iter().any(Self::is_wildcard) {
            Some(rest.iter().map(|(ch, _)| ch).collect())
        } else {
            None
        }
    }

    /// Wildcard pattern with escaped metacharacters kept escaped.
    fn pattern(&self) -> String {
        let mut pattern = String::new();
        for &(ch, escaped) in &self.0 {
            if escaped && matches!(ch, '*' | '?' | '\\') {
                pattern.push('\\');
            }
            pattern.push(ch);
        }
        pattern
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Word(Word),
    Phrase(String),
    Plus,
    Minus,
    Not,
    And,
    Or,
    LParen,
    RParen,
    Colon,
    Caret,
    RangeOpen(bool),
    RangeClose(bool),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Word(word) => format!("'{}'", word.text()),
            Token::Phrase(text) => format!("\"{text}\""),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Not => "NOT".to_string(),
            Token::And => "AND".to_string(),
            Token::Or => "OR".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Caret => "'^'".to_string(),
            Token::RangeOpen(true) => "'['".to_string(),
            Token::RangeOpen(false) => "'{'".to_string(),
            Token::RangeClose(true) => "']'".to_string(),
            Token::RangeClose(false) => "'}'".to_string(),
        }
    }
}

struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn is_delimiter(ch: char) -> bool {
        ch.is_whitespace()
            || matches!(ch, '(' | ')' | ':' | '^' | '[' | ']' | '{' | '}' | '"' | '~')
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(&(offset, ch)) = self.chars.peek() {
            let token = match ch {
                c if c.is_whitespace() => {
                    self.chars.next();
                    continue;
                }
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                ':' => self.single(Token::Colon),
                '^' => self.single(Token::Caret),
                '[' => self.single(Token::RangeOpen(true)),
                '{' => self.single(Token::RangeOpen(false)),
                ']' => self.single(Token::RangeClose(true)),
                '}' => self.single(Token::RangeClose(false)),
                '+' => self.single(Token::Plus),
                '-' => self.single(Token::Minus),
                '!' => self.single(Token::Not),
                '"' => self.phrase(offset)?,
                '~' => {
                    return Err(PaviseError::bad_query(format!(
                        "Fuzzy and proximity searches ('~' at offset {offset}) are not supported"
                    )));
                }
                _ if self.input[offset..].starts_with("&&") => self.double(Token::And),
                _ if self.input[offset..].starts_with("||") => self.double(Token::Or),
                _ => {
                    let word = self.word()?;
                    if word.is_keyword("AND") {
                        Token::And
                    } else if word.is_keyword("OR") {
                        Token::Or
                    } else if word.is_keyword("NOT") {
                        Token::Not
                    } else {
                        Token::Word(word)
                    }
                }
            };
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn single(&mut self, token: Token) -> Token {
        self.chars.next();
        token
    }

    fn double(&mut self, token: Token) -> Token {
        self.chars.next();
        self.chars.next();
        token
    }

    fn phrase(&mut self, start: usize) -> Result<Token> {
        self.chars.next();
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(Token::Phrase(text)),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, escaped)) => text.push(escaped),
                    None => break,
                },
                Some((_, ch)) => text.push(ch),
                None => break,
            }
        }
        Err(PaviseError::bad_query(format!(
            "Unterminated phrase starting at offset {start}"
        )))
    }

    fn word(&mut self) -> Result<Word> {
        let mut chars = Vec::new();
        while let Some(&(offset, ch)) = self.chars.peek() {
            if Self::is_delimiter(ch) {
                break;
            }
            self.chars.next();
            if ch == '\\' {
                match self.chars.next() {
                    Some((_, escaped)) => chars.push((escaped, true)),
                    None => {
                        return Err(PaviseError::bad_query(format!(
                            "Dangling escape at offset {offset}"
                        )));
                    }
                }
            } else {
                chars.push((ch, false));
            }
        }
        Ok(Word(chars))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Conjunction {
    None,
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Modifier {
    None,
    Required,
    Prohibited,
}

/// Internal parser over the token stream.
struct QueryStringParser<'a> {
    parser: &'a QueryParser,
    tokens: Vec<Token>,
    pos: usize,
}

impl QueryStringParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(found: Option<&Token>, expected: &str) -> PaviseError {
        match found {
            Some(token) => {
                PaviseError::bad_query(format!("Expected {expected}, found {}", token.describe()))
            }
            None => PaviseError::bad_query(format!("Expected {expected}, found end of query")),
        }
    }

    /// Parse a sequence of clauses up to the end of input or a `)`.
    fn parse_query(&mut self, field: &str) -> Result<Option<Box<dyn Query>>> {
        let mut clauses: Vec<BooleanClause> = Vec::new();
        let mut first = true;

        while !matches!(self.peek(), None | Some(Token::RParen)) {
            let conjunction = if first {
                Conjunction::None
            } else {
                match self.peek() {
                    Some(Token::And) => {
                        self.pos += 1;
                        Conjunction::And
                    }
                    Some(Token::Or) => {
                        self.pos += 1;
                        Conjunction::Or
                    }
                    _ => Conjunction::None,
                }
            };

            let modifier = match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    Modifier::Required
                }
                Some(Token::Minus) | Some(Token::Not) => {
                    self.pos += 1;
                    Modifier::Prohibited
                }
                _ => Modifier::None,
            };

            let query = self.parse_clause(field)?;
            self.add_clause(&mut clauses, conjunction, modifier, query);
            first = false;
        }

        if clauses.len() == 1 && clauses[0].occur == Occur::Should {
            return Ok(clauses.pop().map(|clause| clause.query));
        }
        if clauses.is_empty() {
            return Ok(None);
        }

        let mut boolean = BooleanQuery::new();
        for clause in clauses {
            boolean.add_clause(clause);
        }
        Ok(Some(Box::new(boolean)))
    }

    /// Add a clause, adjusting the previous one for an explicit conjunction.
    fn add_clause(
        &self,
        clauses: &mut Vec<BooleanClause>,
        conjunction: Conjunction,
        modifier: Modifier,
        query: Option<Box<dyn Query>>,
    ) {
        let and_default = self.parser.default_operator == Operator::And;

        if let Some(previous) = clauses.last_mut() {
            if previous.occur != Occur::MustNot {
                if conjunction == Conjunction::And {
                    previous.occur = Occur::Must;
                } else if and_default && conjunction == Conjunction::Or {
                    previous.occur = Occur::Should;
                }
            }
        }

        let Some(query) = query else {
            return;
        };

        let prohibited = modifier == Modifier::Prohibited;
        let required = if and_default {
            !prohibited && conjunction != Conjunction::Or
        } else {
            modifier == Modifier::Required || (conjunction == Conjunction::And && !prohibited)
        };

        let occur = if prohibited {
            Occur::MustNot
        } else if required {
            Occur::Must
        } else {
            Occur::Should
        };
        clauses.push(BooleanClause::new(query, occur));
    }

    /// Parse one clause: an optional `field:` then a term, phrase, range or
    /// group, then an optional boost.
    fn parse_clause(&mut self, field: &str) -> Result<Option<Box<dyn Query>>> {
        let mut field = field.to_string();
        if let (Some(Token::Word(word)), Some(Token::Colon)) = (self.peek(), self.peek_at(1)) {
            field = word.text();
            self.pos += 2;
        }

        let query = match self.next() {
            Some(Token::LParen) => {
                let inner = self.parse_query(&field)?;
                if self.next() != Some(Token::RParen) {
                    return Err(PaviseError::bad_query(
                        "Unbalanced parenthesis: missing ')'",
                    ));
                }
                inner
            }
            Some(Token::Phrase(text)) => self.phrase_query(&field, &text)?,
            Some(Token::RangeOpen(include_lower)) => Some(self.range_query(&field, include_lower)?),
            Some(Token::Word(word)) => self.term_query(&field, &word)?,
            other => return Err(Self::unexpected(other.as_ref(), "a term")),
        };

        let boost = self.parse_boost()?;
        Ok(query.map(|mut query| {
            if let Some(boost) = boost {
                query.set_boost(boost);
            }
            query
        }))
    }

    fn parse_boost(&mut self) -> Result<Option<f32>> {
        if self.peek() != Some(&Token::Caret) {
            return Ok(None);
        }
        self.pos += 1;

        match self.next() {
            Some(Token::Word(word)) => word
                .text()
                .parse::<f32>()
                .ok()
                .filter(|boost| boost.is_finite() && *boost >= 0.0)
                .map(Some)
                .ok_or_else(|| PaviseError::bad_query(format!("Invalid boost '{}'", word.text()))),
            _ => Err(PaviseError::bad_query("Expected a number after '^'")),
        }
    }

    fn term_query(&self, field: &str, word: &Word) -> Result<Option<Box<dyn Query>>> {
        let text = word.text();
        if field == "*" && word.is_keyword("*") {
            return Ok(Some(Box::new(MatchAllQuery::new())));
        }

        if word.has_wildcard() {
            if let Some(prefix) = word.as_prefix() {
                let prefix = self.parser.normalize(field, &prefix);
                return Ok(Some(Box::new(PrefixQuery::new(field, prefix))));
            }
            let pattern = self.parser.normalize(field, &word.pattern());
            return Ok(Some(Box::new(WildcardQuery::new(field, pattern)?)));
        }

        if self.parser.is_untokenized(field) {
            return Ok(Some(Box::new(TermQuery::new(field, text))));
        }

        let terms = self.parser.analyzed_terms(&text)?;
        Ok(match terms.len() {
            0 => None,
            1 => terms
                .into_iter()
                .next()
                .map(|(_, term)| Box::new(TermQuery::new(field, term)) as Box<dyn Query>),
            _ => {
                let mut boolean = BooleanQuery::new();
                for (_, term) in terms {
                    boolean.add_should(Box::new(TermQuery::new(field, term)));
                }
                Some(Box::new(boolean) as Box<dyn Query>)
            }
        })
    }

    fn phrase_query(&self, field: &str, text: &str) -> Result<Option<Box<dyn Query>>> {
        if self.parser.is_untokenized(field) {
            return Ok(Some(Box::new(TermQuery::new(field, text))));
        }

        let mut terms = self.parser.analyzed_terms(text)?;
        Ok(match terms.len() {
            0 => None,
            1 => terms
                .pop()
                .map(|(_, term)| Box::new(TermQuery::new(field, term)) as Box<dyn Query>),
            _ => {
                let first = terms[0].0;
                let relative = terms
                    .into_iter()
                    .map(|(position, term)| (position - first, term))
                    .collect();
                Some(Box::new(PhraseQuery::with_positions(field, relative)) as Box<dyn Query>)
            }
        })
    }

    fn range_bound(&mut self, field: &str) -> Result<Option<String>> {
        match self.next() {
            Some(Token::Word(word)) if word.is_keyword("*") => Ok(None),
            Some(Token::Word(word)) => Ok(Some(self.parser.normalize(field, &word.text()))),
            Some(Token::Phrase(text)) => Ok(Some(self.parser.normalize(field, &text))),
            other => Err(Self::unexpected(other.as_ref(), "a range bound")),
        }
    }

    fn range_query(&mut self, field: &str, include_lower: bool) -> Result<Box<dyn Query>> {
        let lower = self.range_bound(field)?;

        match self.next() {
            Some(Token::Word(word)) if word.is_keyword("TO") => {}
            other => return Err(Self::unexpected(other.as_ref(), "TO in range")),
        }

        let upper = self.range_bound(field)?;
        let include_upper = match self.next() {
            Some(Token::RangeClose(inclusive)) => inclusive,
            _ => return Err(PaviseError::bad_query("Unterminated range: missing ']' or '}'")),
        };

        Ok(Box::new(RangeQuery::new(
            field,
            lower,
            upper,
            include_lower,
            include_upper,
        )))
    }
}
