//! Blog API demonstrating a permission-gated, audited resource
//!
//! Run with `cargo run --example blog_api`, then:
//!
//! ```text
//! curl -H 'Authorization: Bearer root-token' localhost:8080/api
//! curl -X POST -H 'Authorization: Bearer alice-token' \
//!      -d '{"title":"Hello","body":"First post"}' localhost:8080/api/blog-posts/new
//! curl -H 'Authorization: Bearer alice-token' localhost:8080/api/blog-posts
//! curl -H 'Authorization: Bearer root-token' \
//!      'localhost:8080/api/timeline?resource_name=blog-posts&resource_id=1'
//! ```

use warden::core::record::field;
use warden::prelude::*;

resource_model!(BlogPost, "BlogPost", {
    title: String,
    body: String,
    status: String,
});

resource_model!(Tag, "Tag", {
    label: String,
});

/// `GET /whoami`: the principal resolved from the bearer token
async fn whoami(ctx: RequestContext) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "id": ctx.principal.id,
        "label": ctx.principal.label,
        "roles": ctx.principal.roles.to_list_string(),
        "trace_id": ctx.trace_id,
    }))
}

async fn seeded_store() -> Result<InMemoryStore> {
    let store = InMemoryStore::new().with_unique("users", "email");

    let root = User::new(
        "Root".to_string(),
        "root@example.com".to_string(),
        "sub-root".to_string(),
        RoleSet::parse_list("admin"),
    );
    let mut record = Record::from_model(&root)?;
    record.remove(field::ID);
    store.create("users", record).await?;

    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::from_yaml_file(&path)?,
        None => ServerConfig::default(),
    };
    init_tracing(&config.log_filter);

    let verifier = StaticTokenVerifier::new()
        .with_token("root-token", Claims::new("sub-root").with_email("root@example.com"))
        .with_token(
            "alice-token",
            Claims::new("sub-alice")
                .with_email("alice@example.com")
                .with_name("Alice"),
        )
        .with_token("bob-token", Claims::new("sub-bob").with_email("bob@example.com"));

    let posts = ResourceConfig::new::<BlogPost>()
        .permissions(
            PermissionMap::new()
                .grant_all(Role::admin())
                .grant_all(Role::visitor()),
        )
        .validate("title", validators::required())
        .validate("title", validators::string_length(1, 120))
        .validate("status", validators::one_of(&["", "draft", "published"]));

    // Tags are shared: everyone reads all of them, only admins write
    let tags = ResourceConfig::new::<Tag>()
        .permissions(
            PermissionMap::new()
                .grant_all(Role::admin())
                .grant(Role::visitor(), [Operation::Read]),
        )
        .validate("label", validators::required())
        .skip_user_binding();

    let bind_address = config.bind_address.clone();
    ServerBuilder::new()
        .with_config(config)
        .with_store(seeded_store().await?)
        .with_token_verifier(verifier)
        .with_user_resource()?
        .register(posts)?
        .register(tags)?
        .with_custom_routes(Router::new().route("/whoami", get(whoami)))
        .serve(Some(&bind_address))
        .await
}
