use super::*;
use pricewatch::scraper::StaticPage;
use pricewatch::store::ObservationStore;
use pricewatch::RunOutcome;

const KETTLE_URL: &str = "https://shop.example/kettle";

#[tokio::test]
async fn test_structured_data_page_is_recorded() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = get_test_config(dir.path());
    let notifier = RecordingNotifier::default();
    let (runner, store) = create_test_runner(&config, &notifier).await?;

    let page = StaticPage::new().with_page(
        KETTLE_URL,
        r#"<html><head>
            <script type="application/ld+json">
                {"@context": "https://schema.org", "@type": "Product",
                 "offers": {"@type": "Offer", "price": "49.00", "priceCurrency": "GBP"}}
            </script>
        </head><body><p>Add to basket</p></body></html>"#,
    );
    let items = [watch_item("Kettle", KETTLE_URL, "30", None)];

    let report = runner.run(&items, &page, &store).await?;

    assert_eq!(report.outcome(), RunOutcome::NoAlerts);
    let history = store.observations("Kettle").await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].price, Some(dec("49.0")));
    assert_eq!(history[0].note, "jsonld");
    assert!(history[0].success);
    assert!(notifier.sent().is_empty());

    store.close().await;
    Ok(())
}

#[tokio::test]
async fn test_unpriced_page_leaves_failure_trail() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = get_test_config(dir.path());
    let notifier = RecordingNotifier::default();
    let (runner, store) = create_test_runner(&config, &notifier).await?;

    let page = StaticPage::new().with_page(
        KETTLE_URL,
        "<html><body><p>Temporarily out of stock</p></body></html>",
    );
    let items = [watch_item("Kettle: 1.7L", KETTLE_URL, "30", Some("span.price"))];

    let report = runner.run(&items, &page, &store).await?;

    assert_eq!(report.checked, 1);
    assert_eq!(report.succeeded, 0);

    let history = store.observations("Kettle: 1.7L").await?;
    assert_eq!(history.len(), 1);
    let observation = &history[0];
    assert_eq!(observation.price, None);
    assert!(!observation.success);

    let snapshot = config.screenshots.directory.join("Kettle_1.7L.html");
    assert_eq!(
        observation.note,
        format!(
            "selector_failed|jsonld_failed|regex_failed|screenshot={}",
            snapshot.display()
        )
    );
    assert!(snapshot.exists());

    store.close().await;
    Ok(())
}

#[tokio::test]
async fn test_alert_fires_once_per_crossing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = get_test_config(dir.path());
    let notifier = RecordingNotifier::default();
    let (runner, store) = create_test_runner(&config, &notifier).await?;
    let items = [watch_item("Kettle", KETTLE_URL, "10", Some("span.price"))];

    let mut outcomes = Vec::new();
    for price in ["12.00", "9.99", "9.50", "11.00", "10.00"] {
        let page = StaticPage::new().with_page(KETTLE_URL, price_page(price));
        let report = runner.run(&items, &page, &store).await?;
        outcomes.push(report.outcome());
    }

    assert_eq!(
        outcomes,
        vec![
            RunOutcome::NoAlerts,
            RunOutcome::AlertsFired,
            RunOutcome::NoAlerts,
            RunOutcome::NoAlerts,
            RunOutcome::AlertsFired,
        ]
    );

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "Price alert: target hit");
    assert_eq!(
        sent[0].1,
        "Kettle\nhttps://shop.example/kettle\nNow: £9.99 (target £10.00)\nPrev: £12.00\n"
    );
    assert!(sent[1].1.contains("Now: £10.00 (target £10.00)\nPrev: £11.00"));

    assert_eq!(store.observations("Kettle").await?.len(), 5);
    assert_eq!(store.last_price("Kettle").await?, Some(dec("10.00")));

    store.close().await;
    Ok(())
}

#[tokio::test]
async fn test_failed_check_does_not_reset_previous_price() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut config = get_test_config(dir.path());
    config.screenshots.enabled = false;
    let notifier = RecordingNotifier::default();
    let (runner, store) = create_test_runner(&config, &notifier).await?;
    let items = [watch_item("Kettle", KETTLE_URL, "10", None)];

    let below = StaticPage::new().with_page(KETTLE_URL, price_page("8.00"));
    let broken = StaticPage::new();

    assert_eq!(runner.run(&items, &below, &store).await?.outcome(), RunOutcome::AlertsFired);
    assert_eq!(runner.run(&items, &broken, &store).await?.outcome(), RunOutcome::NoAlerts);
    // Still below target after the gap, so no fresh alert
    assert_eq!(runner.run(&items, &below, &store).await?.outcome(), RunOutcome::NoAlerts);

    let notes: Vec<String> = store
        .observations("Kettle")
        .await?
        .into_iter()
        .map(|o| o.note)
        .collect();
    assert_eq!(notes, vec!["regex", "exception:Navigation", "regex"]);
    assert_eq!(notifier.sent().len(), 1);

    store.close().await;
    Ok(())
}

#[tokio::test]
async fn test_history_persists_between_runs() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = get_test_config(dir.path());
    let items = [watch_item("Kettle", KETTLE_URL, "10", None)];

    let first = RecordingNotifier::default();
    let (runner, store) = create_test_runner(&config, &first).await?;
    let page = StaticPage::new().with_page(KETTLE_URL, price_page("9.00"));
    runner.run(&items, &page, &store).await?;
    store.close().await;

    // A new process sees the stored price and stays quiet
    let second = RecordingNotifier::default();
    let (runner, store) = create_test_runner(&config, &second).await?;
    let report = runner.run(&items, &page, &store).await?;

    assert_eq!(report.outcome().exit_code(), 0);
    assert_eq!(first.sent().len(), 1);
    assert!(second.sent().is_empty());

    store.close().await;
    Ok(())
}
