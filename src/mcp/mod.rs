//! MCP server for book search
//!
//! Exposes semantic search, browse and dataset facets as tools over stdio.

mod server;

pub use server::run_mcp_server;

use colored::Colorize;

/// Print a client configuration snippet for this binary
pub fn print_install_instructions() {
    let working_dir = std::env::current_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "/path/to/bookfinder".to_string());

    let binary_path = std::env::current_exe()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "bookfinder".to_string());

    println!("{}", "MCP Server Installation Guide".bold().cyan());
    println!();
    println!("Add the following to your MCP client configuration:");
    println!();
    println!(
        r#"{{
  "mcpServers": {{
    "bookfinder": {{
      "command": "{}",
      "args": ["mcp"],
      "cwd": "{}"
    }}
  }}
}}"#,
        binary_path, working_dir
    );
    println!();
    println!(
        "{}",
        "Configuration is read from .env in the working directory (DATASET_PATH, CHROMA_HOST, ...)."
            .dimmed()
    );
    println!();
    println!("{}", "Available tools:".bold());
    println!("  • {} - Semantic search with filters", "book_search".green());
    println!("  • {} - Filter the full dataset", "book_browse".green());
    println!("  • {} - Categories, publishers, price and year bounds", "book_facets".green());
    println!("  • {} - Vector index backend and size", "index_status".green());
}
