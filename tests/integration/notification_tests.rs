use super::*;
use pricewatch::scraper::StaticPage;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_alert_reaches_discord_webhook() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/42/token"))
        .and(body_string_contains("Price alert: target hit"))
        .and(body_string_contains("Now: £9.99 (target £10.00)"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let mut config = get_test_config(dir.path());
    config.notifications.discord.webhook_url = Some(format!("{}/api/webhooks/42/token", server.uri()));

    let notifiers = NotifierSet::from_config(&config.notifications);
    assert_eq!(notifiers.configured(), vec!["discord"]);

    let store = SqliteStore::connect(&config.database).await?;
    let runner = WatchRunner::new(Extractor::new(&config.scraper, &config.screenshots), notifiers);
    let page = StaticPage::new().with_page("https://shop.example/kettle", price_page("9.99"));
    let items = [watch_item("Kettle", "https://shop.example/kettle", "10", None)];

    let report = runner.run(&items, &page, &store).await?;

    assert_eq!(report.alerts.len(), 1);
    store.close().await;
    Ok(())
}

#[tokio::test]
async fn test_delivery_failure_does_not_fail_run() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let mut config = get_test_config(dir.path());
    config.notifications.discord.webhook_url = Some(server.uri());

    let store = SqliteStore::connect(&config.database).await?;
    let runner = WatchRunner::new(
        Extractor::new(&config.scraper, &config.screenshots),
        NotifierSet::from_config(&config.notifications),
    );
    let page = StaticPage::new().with_page("https://shop.example/kettle", price_page("9.99"));
    let items = [watch_item("Kettle", "https://shop.example/kettle", "10", None)];

    let report = runner.run(&items, &page, &store).await?;

    assert_eq!(report.outcome().exit_code(), 2);
    store.close().await;
    Ok(())
}
