use std::env;
use std::process;

use pagedb::{codec, LinkSource, PageDB, Result};

fn print_usage() {
    eprintln!("USAGE:");
    eprintln!("    pagedb-inspect <directory> <command>");
    eprintln!();
    eprintln!("COMMANDS:");
    eprintln!("    info     Show page and edge counts");
    eprintln!("    pages    Print one line per stored page record");
    eprintln!("    links    Print every edge as 'from -> to'");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("    pagedb-inspect ./crawl-db info");
    eprintln!("    pagedb-inspect ./crawl-db pages");
    eprintln!();
}

fn print_field(name: &str, value: impl std::fmt::Display) {
    println!("  {:.<24} {}", name, value);
}

fn cmd_info(db: &PageDB) -> Result<()> {
    let n_pages = db.n_pages()?;
    let mut crawled = 0u64;
    db.for_each_info(|_, info| {
        if info.is_crawled() {
            crawled += 1;
        }
    })?;
    let n_edges = db.open_link_stream()?.drain()?.len();

    print_field("pages", n_pages);
    print_field("crawled pages", crawled);
    print_field("link-only pages", n_pages.saturating_sub(crawled));
    print_field("edges", n_edges);
    Ok(())
}

fn cmd_pages(db: &PageDB) -> Result<()> {
    db.for_each_info(|hash, info| {
        println!("{hash:#018x} {}", codec::print_line(&info));
    })
}

fn cmd_links(db: &PageDB) -> Result<()> {
    let mut stream = db.open_link_stream()?;
    for edge in stream.drain()? {
        println!("{} -> {}", edge.from, edge.to);
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        print_usage();
        process::exit(2);
    }

    let db = match PageDB::open(&args[1]) {
        Ok(db) => db,
        Err(err) => {
            eprintln!("error: cannot open {}: {err}", args[1]);
            process::exit(1);
        }
    };

    let result = match args[2].as_str() {
        "info" => cmd_info(&db),
        "pages" => cmd_pages(&db),
        "links" => cmd_links(&db),
        other => {
            eprintln!("error: unknown command '{other}'");
            print_usage();
            process::exit(2);
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        process::exit(1);
    }
}
