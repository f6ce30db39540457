use pagedb::{
    url_hash, CrawledPage, Edge, LinkSource, Options, PageDB, Result, StreamState,
};
use tempfile::TempDir;

fn page(url: &str, time: f64, score: f32, hash: u64, links: &[(&str, f32)]) -> CrawledPage {
    let mut page = CrawledPage::new(url);
    page.time = time;
    page.score = score;
    page.set_hash64(hash);
    for (link_url, link_score) in links {
        page.add_link(*link_url, *link_score);
    }
    page
}

fn page_a(hash: u64) -> CrawledPage {
    page(
        "http://a/",
        1000.0,
        0.5,
        hash,
        &[("http://b/", 0.1), ("http://c/", 0.2)],
    )
}

fn edges(db: &PageDB) -> Result<Vec<Edge>> {
    db.open_link_stream()?.drain()
}

#[test]
fn first_add_issues_dense_indices_and_edges() -> Result<()> {
    let dir = TempDir::new()?;
    let db = PageDB::open(dir.path())?;

    let snapshots = db.add(&page_a(0xAA))?;

    assert_eq!(db.n_pages()?, 3);
    assert_eq!(db.get_idx("http://a/")?, Some(0));
    assert_eq!(db.get_idx("http://b/")?, Some(1));
    assert_eq!(db.get_idx("http://c/")?, Some(2));
    assert_eq!(
        edges(&db)?,
        vec![Edge { from: 0, to: 1 }, Edge { from: 0, to: 2 }]
    );

    // Snapshots cover the source and both newly observed targets.
    assert_eq!(snapshots.len(), 3);
    assert_eq!(snapshots[0].0, url_hash(b"http://a/"));
    assert_eq!(snapshots[0].1.n_crawls, 1);
    assert_eq!(snapshots[1].1.n_crawls, 0);

    let info_a = db.get_info_from_url("http://a/")?.unwrap();
    assert_eq!(info_a.n_crawls, 1);
    assert_eq!(info_a.first_crawl, 1000.0);
    assert_eq!(info_a.last_crawl, 1000.0);
    assert_eq!(info_a.score, 0.5);

    let info_b = db.get_info_from_url("http://b/")?.unwrap();
    assert_eq!(info_b.n_crawls, 0);
    assert_eq!(info_b.first_crawl, 0.0);
    assert!(info_b.content_hash.is_empty());
    Ok(())
}

#[test]
fn crawling_a_known_link_target_reuses_its_index() -> Result<()> {
    let dir = TempDir::new()?;
    let db = PageDB::open(dir.path())?;
    db.add(&page_a(0xAA))?;

    let snapshots = db.add(&page("http://b/", 1100.0, 0.7, 0xBB, &[("http://a/", 0.0)]))?;

    assert_eq!(db.n_pages()?, 3);
    assert_eq!(
        edges(&db)?,
        vec![
            Edge { from: 0, to: 1 },
            Edge { from: 0, to: 2 },
            Edge { from: 1, to: 0 },
        ]
    );

    let info_b = db.get_info_from_url("http://b/")?.unwrap();
    assert_eq!(info_b.first_crawl, 1100.0);
    assert_eq!(info_b.last_crawl, 1100.0);
    assert_eq!(info_b.n_crawls, 1);
    assert_eq!(info_b.score, 0.7);

    // "http://a/" already had an index and a record, so only the source
    // shows up in the snapshots.
    assert_eq!(snapshots.len(), 1);
    Ok(())
}

#[test]
fn identical_re_add_counts_a_crawl_without_a_change() -> Result<()> {
    let dir = TempDir::new()?;
    let db = PageDB::open(dir.path())?;
    db.add(&page_a(0xAA))?;
    db.add(&page_a(0xAA))?;

    assert_eq!(db.n_pages()?, 3);
    let info_a = db.get_info_from_url("http://a/")?.unwrap();
    assert_eq!(info_a.n_crawls, 2);
    assert_eq!(info_a.n_changes, 0);
    assert_eq!(info_a.last_crawl, 1000.0);
    assert_eq!(
        edges(&db)?,
        vec![Edge { from: 0, to: 1 }, Edge { from: 0, to: 2 }]
    );
    Ok(())
}

#[test]
fn content_hash_change_is_detected() -> Result<()> {
    let dir = TempDir::new()?;
    let db = PageDB::open(dir.path())?;
    db.add(&page_a(0xAA))?;
    db.add(&page_a(0xCC))?;

    let info_a = db.get_info_from_url("http://a/")?.unwrap();
    assert_eq!(info_a.n_changes, 1);
    assert_eq!(info_a.content_hash, 0xCCu64.to_le_bytes().to_vec());
    Ok(())
}

#[test]
fn indices_grow_monotonically_from_n_pages() -> Result<()> {
    let dir = TempDir::new()?;
    let db = PageDB::open(dir.path())?;

    for i in 0..20 {
        let before = db.n_pages()?;
        let url = format!("http://site-{i}/");
        db.add(&page(&url, 1000.0 + i as f64, 0.0, i, &[]))?;
        assert_eq!(db.get_idx(&url)?, Some(before));
        assert_eq!(db.n_pages()?, before + 1);
    }
    Ok(())
}

#[test]
fn distinct_urls_map_to_distinct_indices() -> Result<()> {
    let dir = TempDir::new()?;
    let db = PageDB::open(dir.path())?;

    let urls: Vec<String> = (0..50).map(|i| format!("http://host/{i}")).collect();
    let mut crawl = CrawledPage::new("http://host/");
    crawl.time = 1.0;
    for url in &urls {
        crawl.add_link(url, 0.0);
    }
    db.add(&crawl)?;

    let mut seen = std::collections::BTreeSet::new();
    for url in &urls {
        let idx = db.get_idx(url)?.unwrap();
        assert!(seen.insert(idx), "index {idx} issued twice");
    }
    // Indices form a dense prefix: source took 0, links took 1..=50.
    let n = db.n_pages()?;
    assert_eq!(n, 51);
    assert_eq!(seen.iter().copied().collect::<Vec<_>>(), (1..n).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn re_add_replaces_the_edge_list() -> Result<()> {
    let dir = TempDir::new()?;
    let db = PageDB::open(dir.path())?;

    db.add(&page(
        "http://u/",
        1.0,
        0.0,
        1,
        &[("http://x/", 0.0), ("http://y/", 0.0)],
    ))?;
    db.add(&page("http://u/", 2.0, 0.0, 1, &[("http://z/", 0.0)]))?;

    let idx_u = db.get_idx("http://u/")?.unwrap();
    let idx_z = db.get_idx("http://z/")?.unwrap();
    let from_u: Vec<Edge> = edges(&db)?
        .into_iter()
        .filter(|edge| edge.from == idx_u)
        .collect();
    assert_eq!(from_u, vec![Edge { from: idx_u, to: idx_z }]);
    Ok(())
}

#[test]
fn duplicate_and_self_links_are_kept_in_page_order() -> Result<()> {
    let dir = TempDir::new()?;
    let db = PageDB::open(dir.path())?;

    db.add(&page(
        "http://u/",
        1.0,
        0.0,
        1,
        &[
            ("http://v/", 0.0),
            ("http://u/", 0.0),
            ("http://v/", 0.0),
        ],
    ))?;

    assert_eq!(db.n_pages()?, 2);
    assert_eq!(
        edges(&db)?,
        vec![
            Edge { from: 0, to: 1 },
            Edge { from: 0, to: 0 },
            Edge { from: 0, to: 1 },
        ]
    );
    Ok(())
}

#[test]
fn empty_link_list_is_present_but_yields_no_edges() -> Result<()> {
    let dir = TempDir::new()?;
    let db = PageDB::open(dir.path())?;

    db.add(&page("http://lonely/", 1.0, 0.0, 1, &[]))?;
    assert_eq!(db.n_pages()?, 1);
    assert!(edges(&db)?.is_empty());

    // A later page still streams; the empty entry is skipped, not an error.
    db.add(&page("http://talkative/", 2.0, 0.0, 2, &[("http://lonely/", 0.0)]))?;
    assert_eq!(edges(&db)?, vec![Edge { from: 1, to: 0 }]);
    Ok(())
}

#[test]
fn stream_restarts_identically_mid_iteration() -> Result<()> {
    let dir = TempDir::new()?;
    let db = PageDB::open(dir.path())?;
    db.add(&page_a(0xAA))?;
    db.add(&page("http://b/", 1.0, 0.0, 2, &[("http://c/", 0.0)]))?;

    let mut stream = db.open_link_stream()?;
    let mut edge = Edge::default();
    assert_eq!(stream.next(&mut edge), StreamState::Next);
    assert_eq!(stream.next(&mut edge), StreamState::Next);

    let first = stream.drain()?;
    let second = stream.drain()?;
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    Ok(())
}

#[test]
fn stream_sees_a_snapshot_fixed_at_creation() -> Result<()> {
    let dir = TempDir::new()?;
    let db = PageDB::open(dir.path())?;
    db.add(&page_a(0xAA))?;

    let mut stream = db.open_link_stream()?;
    db.add(&page("http://b/", 1.0, 0.0, 2, &[("http://a/", 0.0)]))?;

    assert_eq!(
        stream.drain()?,
        vec![Edge { from: 0, to: 1 }, Edge { from: 0, to: 2 }]
    );

    let mut fresh = db.open_link_stream()?;
    assert_eq!(fresh.drain()?.len(), 3);
    Ok(())
}

#[test]
fn bulk_crawl_streams_every_edge_once() -> Result<()> {
    const N_PAGES: u64 = 10_000;
    const N_LINKS: u64 = 10;

    let dir = TempDir::new()?;
    let db = PageDB::open_with_options(dir.path(), Options::bulk_load())?;

    for i in 0..N_PAGES {
        let mut crawl = CrawledPage::new(format!("http://p{i}/"));
        crawl.time = i as f64;
        crawl.set_hash64(i);
        for j in 1..=N_LINKS {
            crawl.add_link(format!("http://p{}/", (i + j) % N_PAGES), 0.0);
        }
        db.add(&crawl)?;
    }

    assert_eq!(db.n_pages()?, N_PAGES);

    let mut stream = db.open_link_stream()?;
    let mut edge = Edge::default();
    let mut count = 0u64;
    let mut sources = std::collections::BTreeSet::new();
    let mut last_from = 0u64;
    loop {
        match stream.next(&mut edge) {
            StreamState::Next => {
                assert!(edge.from >= last_from, "sources must come out ordered");
                last_from = edge.from;
                sources.insert(edge.from);
                count += 1;
            }
            StreamState::End => break,
            state => panic!("unexpected stream state {state:?}"),
        }
    }
    assert_eq!(count, N_PAGES * N_LINKS);
    assert_eq!(sources.len() as u64, N_PAGES);
    assert_eq!(*sources.iter().next().unwrap(), 0);
    assert_eq!(*sources.iter().last().unwrap(), N_PAGES - 1);
    Ok(())
}

#[test]
fn reopened_store_resumes_with_identical_state() -> Result<()> {
    let dir = TempDir::new()?;
    {
        let db = PageDB::open(dir.path())?;
        db.add(&page_a(0xAA))?;
        db.add(&page("http://b/", 1100.0, 0.7, 0xBB, &[("http://a/", 0.0)]))?;
    }

    let db = PageDB::open(dir.path())?;
    assert_eq!(db.n_pages()?, 3);
    assert_eq!(db.get_idx("http://a/")?, Some(0));
    assert_eq!(db.get_idx("http://c/")?, Some(2));

    let info_a = db.get_info_from_url("http://a/")?.unwrap();
    assert_eq!(info_a.n_crawls, 1);
    assert_eq!(info_a.score, 0.5);

    let mut records = 0u64;
    db.for_each_info(|hash, info| {
        assert_eq!(hash, url_hash(info.url.as_bytes()));
        records += 1;
    })?;
    assert_eq!(records, 3);

    assert_eq!(
        edges(&db)?,
        vec![
            Edge { from: 0, to: 1 },
            Edge { from: 0, to: 2 },
            Edge { from: 1, to: 0 },
        ]
    );

    // Further adds keep issuing from the persisted counter.
    db.add(&page("http://d/", 1200.0, 0.0, 0xDD, &[]))?;
    assert_eq!(db.get_idx("http://d/")?, Some(3));
    Ok(())
}

#[test]
fn store_grows_past_its_initial_region_without_losing_data() -> Result<()> {
    const N_PAGES: u64 = 400;
    // Each record carries a ~32 KiB content hash, well past any small
    // initial region once everything is written.
    const HASH_LEN: usize = 32 * 1024;

    let dir = TempDir::new()?;
    {
        let db = PageDB::open_with_options(dir.path(), Options::bulk_load())?;
        for i in 0..N_PAGES {
            let mut crawl = CrawledPage::new(format!("http://big{i}/"));
            crawl.time = i as f64;
            crawl.set_hash(&vec![i as u8; HASH_LEN]);
            db.add(&crawl)?;
        }
        assert_eq!(db.n_pages()?, N_PAGES);
    }

    let db = PageDB::open(dir.path())?;
    assert_eq!(db.n_pages()?, N_PAGES);
    for i in [0, N_PAGES / 2, N_PAGES - 1] {
        let info = db
            .get_info_from_url(&format!("http://big{i}/"))?
            .unwrap();
        assert_eq!(info.content_hash.len(), HASH_LEN);
        assert_eq!(info.content_hash[0], i as u8);
    }
    Ok(())
}

#[test]
fn readers_run_concurrently_with_the_writer() -> Result<()> {
    const N_PAGES: u64 = 300;

    let dir = TempDir::new()?;
    let db = PageDB::open_with_options(dir.path(), Options::bulk_load())?;
    db.add(&page("http://seed/", 1.0, 0.0, 0, &[]))?;

    std::thread::scope(|scope| {
        let writer = scope.spawn(|| -> Result<()> {
            for i in 0..N_PAGES {
                db.add(&page(&format!("http://w{i}/"), i as f64, 0.0, i, &[
                    ("http://seed/", 0.0),
                ]))?;
            }
            Ok(())
        });

        let reader = scope.spawn(|| -> Result<()> {
            for _ in 0..200 {
                // Every snapshot must be internally consistent even while
                // the writer commits.
                let n = db.n_pages()?;
                assert!(n >= 1);
                let info = db.get_info_from_url("http://seed/")?.unwrap();
                assert_eq!(info.url, "http://seed/");
                let edge_count = db.open_link_stream()?.drain()?.len() as u64;
                assert!(edge_count <= N_PAGES);
            }
            Ok(())
        });

        writer.join().expect("writer panicked")?;
        reader.join().expect("reader panicked")
    })?;

    assert_eq!(db.n_pages()?, N_PAGES + 1);
    Ok(())
}
