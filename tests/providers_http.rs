use std::time::Duration;

use anyhow::Result;
use domainprobe::{
    DispatchConfig, Dispatcher, ErrorKind, IpApiProvider, LookupQuery, PingProvider,
    ProviderAdapter, ProviderClient, RdapProvider, ServiceId, VirusTotalProvider,
};
use httpmock::prelude::*;
use serde_json::json;

fn client() -> Result<ProviderClient> {
    ProviderClient::new(Duration::from_secs(5))
}

#[tokio::test]
async fn ip_api_requests_the_domain_path() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/json/example.com");
        then.status(200)
            .json_body(json!({"status": "success", "query": "93.184.216.34"}));
    });

    let provider = IpApiProvider::new(client()?, server.url("/json"));
    let payload = provider.fetch("example.com").await?;

    mock.assert();
    assert_eq!(
        payload,
        json!({"status": "success", "query": "93.184.216.34"})
    );
    Ok(())
}

#[tokio::test]
async fn rdap_splits_ip_and_domain_paths() -> Result<()> {
    let server = MockServer::start();
    let domain_mock = server.mock(|when, then| {
        when.method(GET).path("/domain/example.com");
        then.status(200).json_body(json!({
            "events": [{"eventAction": "registration", "eventDate": "1995-08-14"}],
            "nameservers": [{"ldhName": "a.iana-servers.net"}],
            "notices": ["not interesting"],
        }));
    });
    let ip_mock = server.mock(|when, then| {
        when.method(GET).path("/ip/93.184.216.34");
        then.status(200).json_body(json!({"handle": "EXAMPLE-NET"}));
    });

    let provider = RdapProvider::new(client()?, server.base_url());

    let projected = provider.fetch("example.com").await?;
    domain_mock.assert();
    assert_eq!(
        projected,
        json!({
            "events": [{"eventAction": "registration", "eventDate": "1995-08-14"}],
            "nameservers": [{"ldhName": "a.iana-servers.net"}],
        }),
        "only the registration fields should survive the projection"
    );

    let projected = provider.fetch("93.184.216.34").await?;
    ip_mock.assert();
    assert_eq!(
        projected,
        json!({}),
        "a payload without registration fields should project to an empty object"
    );
    Ok(())
}

#[tokio::test]
async fn ping_sends_key_and_requests_json_output() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/ping/")
            .query_param("host", "example.com")
            .query_param("apikey", "ping-secret")
            .query_param("output", "json");
        then.status(200)
            .json_body(json!({"response": {"replies": []}}));
    });

    let provider = PingProvider::new(client()?, server.url("/ping/"), "ping-secret");
    let payload = provider.fetch("example.com").await?;

    mock.assert();
    assert_eq!(payload, json!({"response": {"replies": []}}));
    Ok(())
}

#[tokio::test]
async fn virus_total_authenticates_and_unwraps_data() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/domains/example.com")
            .header("x-apikey", "vt-secret");
        then.status(200).json_body(json!({
            "data": {"id": "example.com", "attributes": {"reputation": 0}},
            "links": {"self": "ignored"},
        }));
    });

    let provider = VirusTotalProvider::new(client()?, server.url("/domains"), "vt-secret");
    let payload = provider.fetch("example.com").await?;

    mock.assert();
    assert_eq!(
        payload,
        json!({"id": "example.com", "attributes": {"reputation": 0}}),
        "only the data field should reach the caller"
    );
    Ok(())
}

#[tokio::test]
async fn error_statuses_become_network_errors() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/json/example.com");
        then.status(502);
    });

    let provider = IpApiProvider::new(client()?, server.url("/json"));
    let error = provider
        .fetch("example.com")
        .await
        .expect_err("a 502 should fail the lookup");

    assert_eq!(error.kind(), ErrorKind::Network);
    assert!(
        error.message().contains("response has error code: 502"),
        "unexpected message: {}",
        error.message()
    );
    Ok(())
}

#[tokio::test]
async fn unparseable_bodies_become_no_data_errors() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/json/example.com");
        then.status(200).body("<html>definitely not json</html>");
    });

    let provider = IpApiProvider::new(client()?, server.url("/json"));
    let error = provider
        .fetch("example.com")
        .await
        .expect_err("an unparseable body should fail the lookup");

    assert_eq!(error.kind(), ErrorKind::NoData);
    assert!(
        error.message().contains("unable to parse JSON"),
        "unexpected message: {}",
        error.message()
    );
    Ok(())
}

#[tokio::test]
async fn missing_virus_total_data_is_no_data() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/domains/example.com");
        then.status(200).json_body(json!({"error": {"code": "NotFoundError"}}));
    });

    let provider = VirusTotalProvider::new(client()?, server.url("/domains"), "vt-secret");
    let error = provider
        .fetch("example.com")
        .await
        .expect_err("a payload without data should fail the lookup");

    assert_eq!(error.kind(), ErrorKind::NoData);
    assert!(error.message().contains("response has no data field"));
    Ok(())
}

#[tokio::test]
async fn unreachable_hosts_become_network_errors() -> Result<()> {
    let provider = IpApiProvider::new(client()?, "http://127.0.0.1:9/json");
    let error = provider
        .fetch("example.com")
        .await
        .expect_err("a refused connection should fail the lookup");

    assert_eq!(error.kind(), ErrorKind::Network);
    assert!(
        error.message().contains("request failed"),
        "unexpected message: {}",
        error.message()
    );
    Ok(())
}

#[tokio::test]
async fn dispatcher_resolves_a_full_lookup_over_http() -> Result<()> {
    let server = MockServer::start();
    let ip_api_mock = server.mock(|when, then| {
        when.method(GET).path("/json/example.com");
        then.status(200).json_body(json!({"status": "success"}));
    });
    let rdap_mock = server.mock(|when, then| {
        when.method(GET).path("/domain/example.com");
        then.status(200)
            .json_body(json!({"events": [], "notices": ["dropped"]}));
    });
    let ping_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/ping/")
            .query_param("host", "example.com")
            .query_param("apikey", "ping-secret")
            .query_param("output", "json");
        then.status(200).json_body(json!({"response": {}}));
    });
    let virus_total_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/domains/example.com")
            .header("x-apikey", "vt-secret");
        then.status(200).json_body(json!({"data": {"id": "example.com"}}));
    });

    let config = DispatchConfig::builder()
        .pool_size(2)
        .ip_api_url(server.url("/json"))
        .rdap_url(server.base_url())
        .ping_url(server.url("/ping/"))
        .virus_total_url(server.url("/domains"))
        .ping_api_key("ping-secret")
        .virus_total_api_key("vt-secret")
        .build()?;
    let mut dispatcher = Dispatcher::from_config(config)?;
    dispatcher.start().await?;

    let responses = dispatcher
        .submit_query(LookupQuery::new("https://example.com", ServiceId::ALL))
        .await?;

    assert_eq!(responses.len(), 4, "every configured service should answer");
    for response in &responses {
        assert!(
            response.is_success(),
            "{} should succeed, got {:?}",
            response.service(),
            response.error()
        );
    }

    ip_api_mock.assert();
    rdap_mock.assert();
    ping_mock.assert();
    virus_total_mock.assert();

    dispatcher.stop().await?;
    Ok(())
}
