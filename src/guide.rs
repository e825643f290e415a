//! Query syntax guide. One source for `handbook guide`, the `handbook_help`
//! tool and the MCP `instructions` field.

use serde_json::{json, Value};

/// One piece of query syntax.
pub struct SyntaxRule {
    pub form: &'static str,
    pub meaning: &'static str,
    pub example: &'static str,
}

/// A query habit that gets better results.
pub struct Recipe {
    pub name: &'static str,
    pub when: &'static str,
    pub steps: &'static [&'static str],
}

pub struct ToolEntry {
    pub tool: &'static str,
    pub description: &'static str,
}

pub fn syntax() -> Vec<SyntaxRule> {
    vec![
        SyntaxRule {
            form: "word word",
            meaning: "Free words are OR-ed. Articles matching more of the words always rank above articles matching fewer, then BM25 decides.",
            example: "kerning groups",
        },
        SyntaxRule {
            form: "\"several words\"",
            meaning: "Exact phrase: the words must appear consecutively, in the title or in the body.",
            example: "\"mark to base\" anchors",
        },
        SyntaxRule {
            form: "a AND b",
            meaning: "A bare uppercase AND anywhere in the query requires every clause to match (same as mode='all' or --all).",
            example: "smart AND components",
        },
        SyntaxRule {
            form: "a OR b",
            meaning: "Accepted and ignored: OR is already the default.",
            example: "ligature OR ligatures",
        },
        SyntaxRule {
            form: "phrase=true / --phrase",
            meaning: "Treat the whole query as one phrase, quotes not needed.",
            example: "mark to base (with phrase=true)",
        },
        SyntaxRule {
            form: "Case and punctuation",
            meaning: "Matching is case-insensitive. Hyphens and underscores stay inside tokens, so x-height and mark_to_base are single terms.",
            example: "x-height",
        },
        SyntaxRule {
            form: "Common words",
            meaning: "Words like the, to, how and of are ignored outside phrases. Inside a phrase they must match.",
            example: "how to kern -> kern",
        },
    ]
}

pub fn recipes() -> Vec<Recipe> {
    vec![
        Recipe {
            name: "Look up a feature",
            when: "You know the name of the tool, panel or feature",
            steps: &[
                "Search the feature name alone: handbook_search query='anchors'",
                "Title matches rank first; open the top hit with handbook_get",
            ],
        },
        Recipe {
            name: "Answer a how-to question",
            when: "The question is a sentence, e.g. 'how do I attach accents to base letters'",
            steps: &[
                "Reduce the question to its nouns and verbs: 'attach accents base letters'",
                "If a known term exists, quote it: '\"mark to base\" accents'",
                "Read the two or three best snippets before opening full articles",
            ],
        },
        Recipe {
            name: "Narrow a broad result list",
            when: "Many results share a generic word like glyph or font",
            steps: &[
                "Add a second specific term and set mode='all'",
                "Or quote the exact phrase the handbook uses",
            ],
        },
    ]
}

pub fn tools() -> Vec<ToolEntry> {
    vec![
        ToolEntry { tool: "handbook_search", description: "ranked search with snippets (start here)" },
        ToolEntry { tool: "handbook_get", description: "full article text by id" },
        ToolEntry { tool: "handbook_info", description: "snapshot size, generation and age" },
        ToolEntry { tool: "handbook_reload", description: "rebuild after the articles changed on disk" },
        ToolEntry { tool: "handbook_help", description: "this guide as JSON" },
    ]
}

// ─── Renderers ──────────────────────────────────────────────────────

/// Plain-ASCII guide for the terminal.
pub fn render_cli() -> String {
    let mut out = String::new();
    out.push_str("\nhandbook -- Query Syntax\n");
    out.push_str("========================\n\n");

    out.push_str("SYNTAX\n");
    out.push_str("------\n");
    for rule in syntax() {
        out.push_str(&format!("  {}\n", rule.form));
        out.push_str(&format!("    {}\n", rule.meaning));
        out.push_str(&format!("    Example: {}\n\n", rule.example));
    }

    out.push_str("RECIPES\n");
    out.push_str("-------\n");
    for recipe in recipes() {
        out.push_str(&format!("  [{}]\n", recipe.name));
        out.push_str(&format!("  When: {}\n", recipe.when));
        for step in recipe.steps {
            out.push_str(&format!("    - {}\n", step));
        }
        out.push('\n');
    }

    out.push_str("MCP TOOLS\n");
    out.push_str("---------\n");
    for t in tools() {
        out.push_str(&format!("  {:16} {}\n", t.tool, t.description));
    }
    out.push('\n');
    out
}

/// Guide as JSON for the `handbook_help` tool.
pub fn render_json() -> Value {
    let syntax: Vec<Value> = syntax()
        .iter()
        .map(|r| json!({ "form": r.form, "meaning": r.meaning, "example": r.example }))
        .collect();
    let recipes: Vec<Value> = recipes()
        .iter()
        .map(|r| json!({ "name": r.name, "when": r.when, "steps": r.steps }))
        .collect();
    let tools: Vec<Value> = tools()
        .iter()
        .map(|t| json!({ "tool": t.tool, "description": t.description }))
        .collect();

    json!({
        "syntax": syntax,
        "recipes": recipes,
        "tools": tools,
        "ranking": "score = clauses matched + BM25/(1+BM25); ties break by article id",
    })
}

/// Compact text for the MCP `initialize` instructions field.
pub fn render_instructions() -> String {
    let mut out = String::new();
    out.push_str("handbook-search MCP server: lexical search over the font-editor handbook.\n\n");
    out.push_str("Use handbook_search to find articles, then handbook_get to read one in full. ");
    out.push_str("Prefer short keyword queries over full sentences.\n\n");
    out.push_str("QUERY SYNTAX:\n");
    for rule in syntax() {
        out.push_str(&format!("  {}: {}\n", rule.form, rule.meaning));
    }
    out.push_str("\nTOOLS:\n");
    for t in tools() {
        out.push_str(&format!("  {} - {}\n", t.tool, t.description));
    }
    out.push_str("\nCall handbook_help for examples and recipes.\n");
    out
}
