use super::*;
use pricewatch::models::load_watchlist;

#[test]
fn test_load_json_watchlist() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("watchlist.json");
    std::fs::write(
        &path,
        r#"[
            {"name": "Kettle", "url": "https://shop.example/kettle", "target_price": 30, "price_selector": "span.price"},
            {"name": "Lamp", "url": "https://shop.example/lamp", "target_price": "19.99", "currency": "EUR"}
        ]"#,
    )?;

    let items = load_watchlist(&path)?;

    assert_eq!(
        items,
        vec![
            watch_item("Kettle", "https://shop.example/kettle", "30", Some("span.price")),
            WatchItem {
                currency: "EUR".to_string(),
                ..watch_item("Lamp", "https://shop.example/lamp", "19.99", None)
            },
        ]
    );
    Ok(())
}

#[test]
fn test_load_toml_watchlist() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("watchlist.toml");
    std::fs::write(
        &path,
        r#"
[[items]]
name = "Kettle"
url = "https://shop.example/kettle"
target_price = 30.5
"#,
    )?;

    let items = load_watchlist(&path)?;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].target_price, dec("30.5"));
    assert_eq!(items[0].currency, "GBP");
    Ok(())
}

#[test]
fn test_unusable_watchlists_fail_at_startup() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    assert!(load_watchlist(&dir.path().join("missing.json")).is_err());

    let malformed = dir.path().join("malformed.json");
    std::fs::write(&malformed, "[{")?;
    assert!(load_watchlist(&malformed).is_err());

    let duplicated = dir.path().join("duplicated.json");
    std::fs::write(
        &duplicated,
        r#"[
            {"name": "Kettle", "url": "https://a.example/k", "target_price": 1},
            {"name": "Kettle", "url": "https://b.example/k", "target_price": 2}
        ]"#,
    )?;
    assert!(load_watchlist(&duplicated).is_err());

    let negative = dir.path().join("negative.json");
    std::fs::write(
        &negative,
        r#"[{"name": "Kettle", "url": "https://a.example/k", "target_price": -1}]"#,
    )?;
    assert!(load_watchlist(&negative).is_err());
    Ok(())
}
