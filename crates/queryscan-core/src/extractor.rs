//! Structural extraction: token stream to [`ParsedStructure`].
//!
//! One clause-state pass per statement drives everything: table capture
//! after `FROM`/`JOIN`, join records, raw WHERE/GROUP BY/ORDER BY spans,
//! SELECT-list columns, and subquery discovery by nested `SELECT` tokens.
//! CTE definitions are isolated first by parenthesis matching so their
//! bodies are not double-counted as subqueries.
//!
//! Extraction never fails on malformed SQL: an unmatched parenthesis or a
//! missing keyword truncates the affected field and keeps everything else.

use crate::error::EngineError;
use crate::tokenizer::{significant_tokens, split_statements, strip_comments, Token, TokenKind};
use crate::types::{
    AnalysisOptions, CteInfo, JoinInfo, JoinType, ParsedStructure, QueryType, SubqueryClause,
    SubqueryInfo, TableRef,
};

#[cfg(feature = "tracing")]
use tracing::trace;

/// Clause states for the extraction state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseState {
    None,
    Select,
    From,
    Where,
    Join,
    With,
    Group,
    Order,
}

/// Keywords that end a WHERE fragment at the same nesting depth.
const WHERE_TERMINATORS: &[&str] = &[
    "GROUP", "ORDER", "HAVING", "LIMIT", "OFFSET", "UNION", "INTERSECT", "EXCEPT",
];

/// Keywords that end a GROUP BY item list.
const GROUP_TERMINATORS: &[&str] = &[
    "ORDER", "HAVING", "LIMIT", "OFFSET", "UNION", "INTERSECT", "EXCEPT",
];

/// Keywords that end an ORDER BY item list.
const ORDER_TERMINATORS: &[&str] = &["LIMIT", "OFFSET", "UNION", "INTERSECT", "EXCEPT"];

/// Keywords that end a join `ON` condition.
const JOIN_CONDITION_TERMINATORS: &[&str] = &[
    "WHERE", "GROUP", "ORDER", "HAVING", "LIMIT", "OFFSET", "UNION", "INTERSECT", "EXCEPT",
    "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "NATURAL", "JOIN",
];

/// Extracts one [`ParsedStructure`] per statement in the input.
pub fn parse_structures(
    sql: &str,
    options: &AnalysisOptions,
) -> Result<Vec<ParsedStructure>, EngineError> {
    if sql.trim().is_empty() {
        return Err(EngineError::EmptyInput);
    }
    let normalized = strip_comments(sql);
    let statements = split_statements(&normalized);
    if statements.is_empty() {
        return Err(EngineError::EmptyInput);
    }
    statements
        .iter()
        .map(|statement| extract_statement(statement, options))
        .collect()
}

/// Normalized table names referenced by `FROM`/`JOIN` in a text fragment.
/// Used for CTE bodies and subquery bodies.
pub(crate) fn referenced_table_names(text: &str) -> Vec<String> {
    let tokens = significant_tokens(text);
    referenced_tables_in(&tokens)
}

fn extract_statement(
    statement: &str,
    options: &AnalysisOptions,
) -> Result<ParsedStructure, EngineError> {
    let tokens = significant_tokens(statement);
    let depths = compute_depths(&tokens, options)?;

    let extractor = StatementExtractor {
        statement,
        tokens: &tokens,
        depths: &depths,
    };
    Ok(extractor.run())
}

/// Nesting depth of each token. A `(` and its matching `)` carry the depth
/// of the group they delimit.
fn compute_depths(tokens: &[Token], options: &AnalysisOptions) -> Result<Vec<usize>, EngineError> {
    let mut depths = Vec::with_capacity(tokens.len());
    let mut depth = 0usize;
    for token in tokens {
        if token.kind == TokenKind::Punct && token.text == "(" {
            depth += 1;
            if depth > options.max_nesting_depth {
                return Err(EngineError::RecursionLimitExceeded {
                    limit: options.max_nesting_depth,
                });
            }
            depths.push(depth);
        } else if token.kind == TokenKind::Punct && token.text == ")" {
            depths.push(depth);
            depth = depth.saturating_sub(1);
        } else {
            depths.push(depth);
        }
    }
    Ok(depths)
}

struct StatementExtractor<'a> {
    statement: &'a str,
    tokens: &'a [Token],
    depths: &'a [usize],
}

impl StatementExtractor<'_> {
    fn run(&self) -> ParsedStructure {
        let (ctes, cte_body_starts) = self.extract_ctes();

        let mut structure = ParsedStructure {
            query_type: self.query_type(),
            ctes,
            query_length: self.statement.len(),
            query_lines: self.statement.lines().count().max(1),
            ..ParsedStructure::default()
        };

        self.main_pass(&mut structure, &cte_body_starts);

        for table in &mut structure.tables {
            if structure
                .ctes
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(&table.name))
            {
                table.is_cte = true;
            }
        }

        #[cfg(feature = "tracing")]
        trace!(
            tables = structure.tables.len(),
            joins = structure.joins.len(),
            subqueries = structure.subqueries.len(),
            ctes = structure.ctes.len(),
            "extracted statement structure"
        );

        structure
    }

    /// First significant keyword decides the type; a `WITH` statement
    /// reports the kind of its depth-0 body statement.
    fn query_type(&self) -> QueryType {
        let first = match self.tokens.iter().find(|t| t.kind == TokenKind::Keyword) {
            Some(token) => token,
            None => return QueryType::Unknown,
        };
        if !first.is_keyword("WITH") {
            return QueryType::from_keyword(&first.text);
        }
        for (i, token) in self.tokens.iter().enumerate() {
            if self.depths[i] == 0
                && token.kind == TokenKind::Keyword
                && matches!(
                    token.upper().as_str(),
                    "SELECT" | "INSERT" | "UPDATE" | "DELETE"
                )
            {
                return QueryType::from_keyword(&token.text);
            }
        }
        QueryType::Unknown
    }

    /// The single clause-state pass.
    fn main_pass(&self, structure: &mut ParsedStructure, cte_body_starts: &[usize]) {
        let n = self.tokens.len();
        let mut state = ClauseState::None;
        let mut columns_done = false;
        // Open subqueries as (arena index, depth) for parent links.
        let mut open_subqueries: Vec<(usize, usize)> = Vec::new();
        let mut i = 0;

        while i < n {
            let token = &self.tokens[i];
            let depth = self.depths[i];

            if token.kind == TokenKind::Punct && token.text == ")" {
                open_subqueries.retain(|&(_, d)| d < depth);
                i += 1;
                continue;
            }

            if token.kind != TokenKind::Keyword {
                i += 1;
                continue;
            }

            match token.upper().as_str() {
                "WITH" if depth == 0 => {
                    state = ClauseState::With;
                    i += 1;
                }
                "SELECT" => {
                    if depth > 0 && !cte_body_starts.contains(&i) {
                        self.record_subquery(structure, &mut open_subqueries, i, state);
                    }
                    if depth == 0 && !columns_done {
                        structure.columns = self.capture_columns(i);
                        columns_done = true;
                    }
                    state = ClauseState::Select;
                    i += 1;
                }
                "FROM" => {
                    state = ClauseState::From;
                    i = self.capture_from_tables(structure, i + 1);
                }
                // DML targets count as referenced tables too.
                "UPDATE" | "INTO" => {
                    i = self.capture_from_tables(structure, i + 1);
                }
                "JOIN" => {
                    state = ClauseState::Join;
                    i = self.capture_join(structure, i);
                }
                "WHERE" => {
                    state = ClauseState::Where;
                    if let Some(fragment) = self.capture_span(i + 1, depth, WHERE_TERMINATORS) {
                        structure.where_clauses.push(fragment);
                    }
                    i += 1;
                }
                "GROUP" if self.is_keyword_at(i + 1, "BY") => {
                    state = ClauseState::Group;
                    let items = self.capture_items(i + 2, depth, GROUP_TERMINATORS);
                    structure.group_by.extend(items);
                    i += 2;
                }
                "ORDER" if self.is_keyword_at(i + 1, "BY") => {
                    state = ClauseState::Order;
                    let items = self.capture_items(i + 2, depth, ORDER_TERMINATORS);
                    structure.order_by.extend(items);
                    i += 2;
                }
                _ => i += 1,
            }
        }
    }

    fn is_keyword_at(&self, i: usize, word: &str) -> bool {
        self.tokens.get(i).is_some_and(|t| t.is_keyword(word))
    }

    /// Byte offset where the token at `i` starts, or end of statement.
    fn offset_at(&self, i: usize) -> usize {
        self.tokens
            .get(i)
            .map(|t| t.offset)
            .unwrap_or(self.statement.len())
    }

    /// Index of the `)` that closes the group at `depth`, searching from `start`.
    fn find_closing_paren(&self, start: usize, depth: usize) -> Option<usize> {
        (start..self.tokens.len()).find(|&k| {
            self.tokens[k].kind == TokenKind::Punct
                && self.tokens[k].text == ")"
                && self.depths[k] == depth
        })
    }

    /// Raw source span from token `start` up to the first terminator keyword
    /// at `depth`, or a closing parenthesis leaving `depth`.
    fn capture_span(&self, start: usize, depth: usize, terminators: &[&str]) -> Option<String> {
        let mut end = self.tokens.len();
        for k in start..self.tokens.len() {
            let token = &self.tokens[k];
            if self.depths[k] <= depth {
                if token.kind == TokenKind::Keyword
                    && terminators.contains(&token.upper().as_str())
                {
                    end = k;
                    break;
                }
                if token.kind == TokenKind::Punct && token.text == ")" && self.depths[k] <= depth {
                    end = k;
                    break;
                }
            }
        }
        if end <= start {
            return None;
        }
        let text = self.statement[self.offset_at(start)..self.offset_at(end)].trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }

    /// Comma-separated raw items, split at `depth`, ending like
    /// [`Self::capture_span`].
    fn capture_items(&self, start: usize, depth: usize, terminators: &[&str]) -> Vec<String> {
        let mut items = Vec::new();
        let mut item_start = start;
        let mut end = self.tokens.len();

        for k in start..self.tokens.len() {
            let token = &self.tokens[k];
            if self.depths[k] <= depth {
                if token.kind == TokenKind::Keyword
                    && terminators.contains(&token.upper().as_str())
                {
                    end = k;
                    break;
                }
                if token.kind == TokenKind::Punct && token.text == ")" {
                    end = k;
                    break;
                }
                if token.kind == TokenKind::Punct && token.text == "," && self.depths[k] == depth {
                    let text =
                        self.statement[self.offset_at(item_start)..self.offset_at(k)].trim();
                    if !text.is_empty() {
                        items.push(text.to_string());
                    }
                    item_start = k + 1;
                }
            }
        }

        if item_start < end {
            let text = self.statement[self.offset_at(item_start)..self.offset_at(end)].trim();
            if !text.is_empty() {
                items.push(text.to_string());
            }
        }
        items
    }

    /// SELECT-list columns: items up to the matching `FROM`, keeping only the
    /// rightmost identifier per item (which strips `AS` aliases).
    fn capture_columns(&self, select_index: usize) -> Vec<String> {
        let depth = self.depths[select_index];
        let mut from_index = self.tokens.len();
        for k in select_index + 1..self.tokens.len() {
            if self.depths[k] == depth && self.tokens[k].is_keyword("FROM") {
                from_index = k;
                break;
            }
        }

        let mut columns = Vec::new();
        let mut item: Vec<&Token> = Vec::new();
        for k in select_index + 1..from_index {
            let token = &self.tokens[k];
            if token.kind == TokenKind::Punct && token.text == "," && self.depths[k] == depth {
                if let Some(column) = column_from_item(&item) {
                    columns.push(column);
                }
                item.clear();
            } else {
                item.push(token);
            }
        }
        if let Some(column) = column_from_item(&item) {
            columns.push(column);
        }
        columns
    }

    /// Captures the comma-separated table list after `FROM`. Aliases are
    /// consumed but not added to the table set. Returns the index to resume
    /// the main pass at.
    fn capture_from_tables(&self, structure: &mut ParsedStructure, start: usize) -> usize {
        let mut j = start;
        loop {
            match self.tokens.get(j) {
                Some(token) if token.kind == TokenKind::Identifier => {
                    let (name, next) = self.read_qualified_name(j);
                    push_table(structure, &name);
                    j = self.skip_alias(next);
                    if self
                        .tokens
                        .get(j)
                        .is_some_and(|t| t.kind == TokenKind::Punct && t.text == ",")
                    {
                        j += 1;
                        continue;
                    }
                    return j;
                }
                // Derived table or anything else: hand back to the main pass.
                _ => return j,
            }
        }
    }

    /// Handles one `JOIN` keyword at `join_index`: join type from the
    /// preceding keywords, table from the following token, condition from a
    /// lookahead past `ON`. The main pass resumes after the table so that
    /// subqueries inside the condition are still discovered.
    fn capture_join(&self, structure: &mut ParsedStructure, join_index: usize) -> usize {
        let join_type = self.join_type_before(join_index);
        let mut j = join_index + 1;

        let table = match self.tokens.get(j) {
            Some(token) if token.kind == TokenKind::Identifier => {
                let (name, next) = self.read_qualified_name(j);
                push_table(structure, &name);
                j = self.skip_alias(next);
                name
            }
            _ => {
                // Derived table or malformed join; record nothing.
                return join_index + 1;
            }
        };

        let condition = if join_type != JoinType::Cross && self.is_keyword_at(j, "ON") {
            self.capture_span(j + 1, self.depths[j], JOIN_CONDITION_TERMINATORS)
        } else {
            None
        };

        structure.joins.push(JoinInfo {
            join_type,
            table,
            condition,
        });
        j
    }

    /// Join type from the keywords immediately before `JOIN`.
    fn join_type_before(&self, join_index: usize) -> JoinType {
        let mut k = join_index;
        while k > 0 {
            k -= 1;
            let token = &self.tokens[k];
            if token.kind != TokenKind::Keyword {
                break;
            }
            match token.upper().as_str() {
                "OUTER" | "NATURAL" => continue,
                "INNER" => return JoinType::Inner,
                "LEFT" => return JoinType::Left,
                "RIGHT" => return JoinType::Right,
                "FULL" => return JoinType::Full,
                "CROSS" => return JoinType::Cross,
                _ => break,
            }
        }
        JoinType::Inner
    }

    /// Reads a possibly schema-qualified name starting at `i`, returning the
    /// normalized name and the index after it.
    fn read_qualified_name(&self, i: usize) -> (String, usize) {
        let mut name = normalize_name(&self.tokens[i].text);
        let mut j = i + 1;
        while self
            .tokens
            .get(j)
            .is_some_and(|t| t.kind == TokenKind::Punct && t.text == ".")
            && self
                .tokens
                .get(j + 1)
                .is_some_and(|t| t.kind == TokenKind::Identifier)
        {
            name.push('.');
            name.push_str(&normalize_name(&self.tokens[j + 1].text));
            j += 2;
        }
        (name, j)
    }

    /// Skips an optional `AS alias` or bare alias after a table name.
    fn skip_alias(&self, mut j: usize) -> usize {
        if self.is_keyword_at(j, "AS") {
            j += 1;
        }
        if self
            .tokens
            .get(j)
            .is_some_and(|t| t.kind == TokenKind::Identifier)
        {
            j += 1;
        }
        j
    }

    /// Records a nested `SELECT` as a subquery in the flat arena.
    fn record_subquery(
        &self,
        structure: &mut ParsedStructure,
        open_subqueries: &mut Vec<(usize, usize)>,
        select_index: usize,
        state: ClauseState,
    ) {
        let depth = self.depths[select_index];
        let clause = match state {
            ClauseState::Where => SubqueryClause::Where,
            ClauseState::From | ClauseState::Join => SubqueryClause::From,
            ClauseState::Select => SubqueryClause::Select,
            _ => SubqueryClause::Unknown,
        };

        let body_end = self
            .find_closing_paren(select_index + 1, depth)
            .map(|k| self.offset_at(k))
            .unwrap_or(self.statement.len());
        let body = self.statement[self.offset_at(select_index)..body_end]
            .trim()
            .to_string();

        let parent = open_subqueries
            .iter()
            .rev()
            .find(|&&(_, d)| d < depth)
            .map(|&(index, _)| index);

        // A sibling at the same depth replaces the previous open entry.
        open_subqueries.retain(|&(_, d)| d < depth);

        let index = structure.subqueries.len();
        structure.subqueries.push(SubqueryInfo {
            depth,
            clause,
            body,
            parent,
        });
        open_subqueries.push((index, depth));
    }

    /// CTE isolation: locates the first depth-0 `WITH` and matches each
    /// `name AS ( ... )` body by parenthesis depth. Returns the definitions
    /// and the token indices of body-leading `SELECT`s (so the subquery scan
    /// does not double-count CTE bodies).
    fn extract_ctes(&self) -> (Vec<CteInfo>, Vec<usize>) {
        let mut ctes: Vec<CteInfo> = Vec::new();
        let mut body_starts = Vec::new();

        let with_index = match (0..self.tokens.len())
            .find(|&i| self.depths[i] == 0 && self.tokens[i].is_keyword("WITH"))
        {
            Some(i) => i,
            None => return (ctes, body_starts),
        };

        let mut j = with_index + 1;
        if self.is_keyword_at(j, "RECURSIVE") {
            j += 1;
        }

        loop {
            let name = match self.tokens.get(j) {
                Some(token) if token.kind == TokenKind::Identifier => normalize_name(&token.text),
                _ => break,
            };
            j += 1;

            // Optional column list before AS.
            if self
                .tokens
                .get(j)
                .is_some_and(|t| t.kind == TokenKind::Punct && t.text == "(")
            {
                match self.find_closing_paren(j + 1, self.depths[j]) {
                    Some(close) => j = close + 1,
                    None => break,
                }
            }

            if !self.is_keyword_at(j, "AS") {
                break;
            }
            j += 1;

            if !self
                .tokens
                .get(j)
                .is_some_and(|t| t.kind == TokenKind::Punct && t.text == "(")
            {
                break;
            }
            let body_depth = self.depths[j];
            let body_first = j + 1;
            let close = self.find_closing_paren(body_first, body_depth);
            let body_end_index = close.unwrap_or(self.tokens.len());

            let body = self.statement[self.offset_at(body_first)..self.offset_at(body_end_index)]
                .trim()
                .to_string();
            let body_tokens = &self.tokens[body_first..body_end_index];
            let referenced_tables = referenced_tables_in(body_tokens);

            if self
                .tokens
                .get(body_first)
                .is_some_and(|t| t.is_keyword("SELECT"))
            {
                body_starts.push(body_first);
            }

            // Duplicate names keep the later definition.
            match ctes.iter_mut().find(|c| c.name == name) {
                Some(existing) => {
                    existing.body = body;
                    existing.referenced_tables = referenced_tables;
                }
                None => ctes.push(CteInfo {
                    name,
                    body,
                    referenced_tables,
                }),
            }

            j = match close {
                Some(k) => k + 1,
                None => break,
            };
            if self
                .tokens
                .get(j)
                .is_some_and(|t| t.kind == TokenKind::Punct && t.text == ",")
            {
                j += 1;
            } else {
                break;
            }
        }

        (ctes, body_starts)
    }
}

/// Rightmost identifier of a SELECT-list item, or `*` for a bare star.
fn column_from_item(item: &[&Token]) -> Option<String> {
    if item.len() == 1 && item[0].kind == TokenKind::Punct && item[0].text == "*" {
        return Some("*".to_string());
    }
    item.iter()
        .rev()
        .find(|t| t.kind == TokenKind::Identifier)
        .map(|t| t.text.clone())
}

/// Case-folds a name; quotes were already dropped by the tokenizer.
fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn push_table(structure: &mut ParsedStructure, name: &str) {
    if name.is_empty() {
        return;
    }
    if !structure
        .tables
        .iter()
        .any(|t| t.name.eq_ignore_ascii_case(name))
    {
        structure.tables.push(TableRef {
            name: name.to_string(),
            is_cte: false,
        });
    }
}

/// Tables referenced by `FROM`/`JOIN` within a token slice.
fn referenced_tables_in(tokens: &[Token]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if token.kind == TokenKind::Keyword
            && (token.is_keyword("FROM") || token.is_keyword("JOIN"))
        {
            if let Some(next) = tokens.get(i + 1) {
                if next.kind == TokenKind::Identifier {
                    let name = normalize_name(&next.text);
                    if !names.iter().any(|n| n == &name) {
                        names.push(name);
                    }
                    i += 2;
                    continue;
                }
            }
        }
        i += 1;
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(sql: &str) -> ParsedStructure {
        let structures = parse_structures(sql, &AnalysisOptions::default()).expect("extraction");
        ParsedStructure::merge(structures, sql)
    }

    #[test]
    fn test_empty_input() {
        let err = parse_structures("   \n  ", &AnalysisOptions::default()).unwrap_err();
        assert_eq!(err, EngineError::EmptyInput);
    }

    #[test]
    fn test_comment_only_input() {
        let err = parse_structures("-- nothing here\n", &AnalysisOptions::default()).unwrap_err();
        assert_eq!(err, EngineError::EmptyInput);
    }

    #[test]
    fn test_recursion_limit() {
        let sql = format!("SELECT {}1{}", "(".repeat(10), ")".repeat(10));
        let options = AnalysisOptions {
            max_nesting_depth: 4,
        };
        let err = parse_structures(&sql, &options).unwrap_err();
        assert_eq!(err, EngineError::RecursionLimitExceeded { limit: 4 });
    }

    #[test]
    fn test_query_type() {
        assert_eq!(parse_one("SELECT 1").query_type, QueryType::Select);
        assert_eq!(
            parse_one("UPDATE t SET a = 1").query_type,
            QueryType::Update
        );
        assert_eq!(
            parse_one("WITH x AS (SELECT 1) DELETE FROM t").query_type,
            QueryType::Delete
        );
    }

    #[test]
    fn test_table_dedup_case_insensitive() {
        let structure = parse_one("SELECT * FROM Users u JOIN users v ON u.id = v.id");
        assert_eq!(structure.tables.len(), 1);
        assert_eq!(structure.tables[0].name, "users");
    }

    #[test]
    fn test_alias_not_captured_as_table() {
        let structure = parse_one("SELECT * FROM orders o WHERE o.total > 5");
        assert_eq!(structure.table_names(), vec!["orders"]);
    }

    #[test]
    fn test_comma_separated_from_list() {
        let structure = parse_one("SELECT * FROM a, b c, d WHERE a.x = b.x");
        assert_eq!(structure.table_names(), vec!["a", "b", "d"]);
    }

    #[test]
    fn test_schema_qualified_table() {
        let structure = parse_one("SELECT * FROM public.orders");
        assert_eq!(structure.table_names(), vec!["public.orders"]);
    }

    #[test]
    fn test_join_types_and_conditions() {
        let sql = "SELECT * FROM a \
                   LEFT JOIN b ON a.id = b.a_id \
                   CROSS JOIN c \
                   JOIN d ON b.id = d.b_id";
        let structure = parse_one(sql);
        assert_eq!(structure.joins.len(), 3);
        assert_eq!(structure.joins[0].join_type, JoinType::Left);
        assert_eq!(structure.joins[0].condition.as_deref(), Some("a.id = b.a_id"));
        assert_eq!(structure.joins[1].join_type, JoinType::Cross);
        assert_eq!(structure.joins[1].condition, None);
        assert_eq!(structure.joins[2].join_type, JoinType::Inner);
    }

    #[test]
    fn test_join_without_condition() {
        let structure = parse_one("SELECT * FROM a JOIN b");
        assert_eq!(structure.joins.len(), 1);
        assert_eq!(structure.joins[0].condition, None);
    }

    #[test]
    fn test_where_fragment() {
        let structure = parse_one("SELECT * FROM t WHERE a = 1 AND b < 2 ORDER BY a");
        assert_eq!(structure.where_clauses, vec!["a = 1 AND b < 2"]);
    }

    #[test]
    fn test_group_and_order_items() {
        let structure =
            parse_one("SELECT a, COUNT(*) FROM t GROUP BY a, b HAVING COUNT(*) > 1 ORDER BY a DESC, b");
        assert_eq!(structure.group_by, vec!["a", "b"]);
        assert_eq!(structure.order_by, vec!["a DESC", "b"]);
    }

    #[test]
    fn test_columns_strip_aliases() {
        let structure = parse_one("SELECT u.id AS user_id, name, COUNT(*) AS total FROM users u");
        assert_eq!(structure.columns, vec!["user_id", "name", "total"]);
    }

    #[test]
    fn test_columns_star() {
        let structure = parse_one("SELECT * FROM t");
        assert_eq!(structure.columns, vec!["*"]);
    }

    #[test]
    fn test_subquery_in_where() {
        let structure =
            parse_one("SELECT * FROM orders WHERE user_id IN (SELECT id FROM users WHERE active)");
        assert_eq!(structure.subqueries.len(), 1);
        assert_eq!(structure.subqueries[0].depth, 1);
        assert_eq!(structure.subqueries[0].clause, SubqueryClause::Where);
        assert!(structure.subqueries[0].body.starts_with("SELECT id"));
        assert_eq!(structure.subqueries[0].parent, None);
    }

    #[test]
    fn test_nested_subquery_depth_and_parent() {
        let sql = "SELECT * FROM t WHERE a IN (SELECT b FROM u WHERE c IN (SELECT d FROM v))";
        let structure = parse_one(sql);
        assert_eq!(structure.subqueries.len(), 2);
        assert_eq!(structure.max_subquery_depth(), 2);
        assert_eq!(structure.subqueries[1].parent, Some(0));
    }

    #[test]
    fn test_subquery_in_from() {
        let structure = parse_one("SELECT * FROM (SELECT id FROM users) sub");
        assert_eq!(structure.subqueries.len(), 1);
        assert_eq!(structure.subqueries[0].clause, SubqueryClause::From);
    }

    #[test]
    fn test_cte_extraction() {
        let structure =
            parse_one("WITH recent AS (SELECT * FROM orders WHERE ts > now()) SELECT * FROM recent");
        assert_eq!(structure.ctes.len(), 1);
        assert_eq!(structure.ctes[0].name, "recent");
        assert_eq!(structure.ctes[0].referenced_tables, vec!["orders"]);
        // The body is not double-counted as a subquery.
        assert!(structure.subqueries.is_empty());
        // The reference to the CTE is tagged as such.
        let recent = structure.tables.iter().find(|t| t.name == "recent").unwrap();
        assert!(recent.is_cte);
    }

    #[test]
    fn test_multiple_ctes() {
        let sql = "WITH a AS (SELECT * FROM t1), b AS (SELECT * FROM a JOIN t2 ON a.x = t2.x) \
                   SELECT * FROM b";
        let structure = parse_one(sql);
        assert_eq!(structure.ctes.len(), 2);
        assert_eq!(structure.ctes[1].referenced_tables, vec!["a", "t2"]);
    }

    #[test]
    fn test_duplicate_cte_last_wins() {
        let sql = "WITH x AS (SELECT * FROM t1), x AS (SELECT * FROM t2) SELECT * FROM x";
        let structure = parse_one(sql);
        assert_eq!(structure.ctes.len(), 1);
        assert_eq!(structure.ctes[0].referenced_tables, vec!["t2"]);
    }

    #[test]
    fn test_unmatched_paren_truncates_gracefully() {
        let structure = parse_one("SELECT * FROM t WHERE a IN (SELECT b FROM u");
        assert_eq!(structure.subqueries.len(), 1);
        assert!(structure.subqueries[0].body.contains("FROM u"));
    }

    #[test]
    fn test_multi_statement() {
        let structures =
            parse_structures("SELECT * FROM a; SELECT * FROM b;", &AnalysisOptions::default())
                .unwrap();
        assert_eq!(structures.len(), 2);
        assert_eq!(structures[0].table_names(), vec!["a"]);
        assert_eq!(structures[1].table_names(), vec!["b"]);
    }

    #[test]
    fn test_referenced_table_names_helper() {
        let names = referenced_table_names("SELECT * FROM orders JOIN users ON u.id = o.uid");
        assert_eq!(names, vec!["orders", "users"]);
    }
}
