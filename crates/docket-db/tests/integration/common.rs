//! Test utilities for integration tests.
//!
//! Provides helper functions to set up isolated PostgreSQL containers for
//! each test.

use docket_core::models::{NewContact, NewMatter, NewUser};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

/// Sets up a PostgreSQL container with the schema applied and returns a
/// connection pool.
///
/// The container is removed when the returned `ContainerAsync` is dropped,
/// so keep it alive for the test duration.
pub async fn setup_test_db() -> (PgPool, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("postgres", "16")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "postgres")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    let connection_string = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

    // The server logs "ready" once during init before restarting, so retry.
    const MAX_RETRIES: u32 = 30;
    let mut retries = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retries += 1;
                if retries >= MAX_RETRIES {
                    panic!(
                        "Failed to connect to database after {} retries: {}",
                        MAX_RETRIES, e
                    );
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    };

    docket_db::schema::apply(&pool)
        .await
        .expect("Failed to apply schema");

    (pool, container)
}

pub fn sample_user(remote_id: i64, first: &str, last: &str) -> NewUser {
    NewUser {
        remote_id,
        email: Some(format!("{}@firm.example", first.to_lowercase())),
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        full_name: format!("{} {}", first, last),
        role: Some("attorney".to_string()),
        active: true,
    }
}

pub fn sample_contact(remote_id: i64, company: Option<&str>) -> NewContact {
    NewContact {
        remote_id,
        first_name: Some("Maria".to_string()),
        last_name: Some("Gomez".to_string()),
        company_name: company.map(str::to_string),
        display_name: company.unwrap_or("Maria Gomez").to_string(),
        email: None,
        phone: None,
        contact_type: Some(if company.is_some() { "Company" } else { "Person" }.to_string()),
    }
}

/// A matter with a client and status but no assignee.
pub fn sample_matter(remote_id: i64, status: &str) -> NewMatter {
    NewMatter {
        remote_id,
        title: format!("Matter {}", remote_id),
        number: Some(format!("2026-{:04}", remote_id)),
        description: None,
        client_id: Some(20),
        client_name: Some("Maria Gomez".to_string()),
        assignee_id: None,
        assignee_name: None,
        matter_type_id: Some(1),
        matter_type_name: Some("I-130".to_string()),
        status_id: Some(100),
        status_name: Some(status.to_string()),
        opened_at: None,
        closed_at: None,
        deadline: None,
        remote_updated_at: None,
        metadata: serde_json::json!({"source": "test"}),
    }
}
