use axum::extract::Extension;
use axum::routing::get;
use axum::Router;
use veridic_oauth2::{ClaimsIdentity, ClientId, ClientSecret, IntrospectionOptions, Introspector};
use veridic_tower::IntrospectionAuthorizer;

const DEFAULT_AUTHORITY: &str = "http://localhost:5000";

async fn handle_whoami(Extension(identity): Extension<ClaimsIdentity>) -> String {
    let roles: Vec<&str> = identity.roles().collect();
    format!(
        "Hello, {}! roles: [{}]",
        identity.name().unwrap_or("anonymous"),
        roles.join(", ")
    )
}

async fn handle_claims(Extension(identity): Extension<ClaimsIdentity>) -> String {
    identity
        .claims()
        .iter()
        .map(|c| format!("{}: {}\n", c.claim_type, c.value))
        .collect()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,veridic_oauth2=debug,veridic_tower=debug".into()),
        )
        .init();

    let authority =
        std::env::var("INTROSPECTION_AUTHORITY").unwrap_or_else(|_| DEFAULT_AUTHORITY.to_owned());

    let options = IntrospectionOptions::default()
        .with_authority(authority)
        .with_client_credentials(ClientId::from_static("api1"), ClientSecret::from_static("secret"))
        .with_delayed_discovery();

    let introspector = Introspector::new(options).await.unwrap();

    let authorizer = IntrospectionAuthorizer::new(introspector)
        .with_verbose_error_handler::<axum::body::Body>();

    let app = Router::new()
        .route("/whoami", get(handle_whoami))
        .route("/claims", get(handle_claims))
        .layer(authorizer.layer());

    println!("Send a request with `Authorization: Bearer <token>` to http://127.0.0.1:8080/whoami");
    println!("Press Ctrl+C to exit");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
