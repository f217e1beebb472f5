//! Seeds a running instance with demo data through the public API: one
//! partner with three listings and one end user who saves a deal, then
//! prints the resulting directory state.

use uuid::Uuid;

use local_directory_service::clients::directory::DirectoryClient;
use local_directory_service::models::{
    CreateBusinessRequest, DirectoryQuery, RegisterRequest, UserType,
};

fn listing(
    name: &str,
    category: &str,
    address: &str,
    deal: Option<&str>,
) -> CreateBusinessRequest {
    CreateBusinessRequest {
        name: name.into(),
        category: category.into(),
        description: Some(format!("{}, a neighborhood favorite.", name)),
        address: address.into(),
        phone: Some("555-0100".into()),
        email: None,
        website: None,
        image_url: None,
        gallery: Vec::new(),
        has_deals: deal.is_some(),
        deal: deal.map(str::to_string),
        hours: Some(serde_json::json!({
            "monday": "9:00-17:00",
            "saturday": "10:00-14:00"
        })),
        amenities: vec!["wifi".into()],
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let base_url = std::env::var("DIRECTORY_API_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());

    let mut partner = DirectoryClient::new(base_url.clone());
    let run_id = Uuid::new_v4().simple().to_string();

    let auth = partner
        .register(&RegisterRequest {
            name: "Demo Partner".into(),
            email: format!("partner-{}@example.com", run_id),
            password: "demo-password-1".into(),
            user_type: Some(UserType::Partner),
        })
        .await?;
    println!("Registered partner {} ({})", auth.user.name, auth.user.email);

    let listings = [
        listing(
            "Bean Roastery",
            "Cafe",
            "1 A St, Boston, MA",
            Some("Free refill with any pastry"),
        ),
        listing("Harbor Books", "Bookstore", "2 B St, Boston, MA", None),
        listing(
            "Taco Garden",
            "Restaurant",
            "456 Elm St, Austin, Texas",
            Some("Taco Tuesday: 2-for-1"),
        ),
    ];

    let mut first_id = None;
    for payload in &listings {
        let business = partner.create_business(payload).await?;
        println!(
            "Submitted listing '{}' ({:?})",
            business.name, business.approval_status
        );
        first_id.get_or_insert(business.id);
    }

    let mine = partner.list_my_businesses().await?;
    println!("Partner now owns {} listings", mine.len());

    let mut shopper = DirectoryClient::new(base_url);
    let auth = shopper
        .register(&RegisterRequest {
            name: "Demo Shopper".into(),
            email: format!("shopper-{}@example.com", run_id),
            password: "demo-password-1".into(),
            user_type: None,
        })
        .await?;
    println!("Registered shopper {}", auth.user.email);

    // New listings are pending until an admin approves them, so the public
    // directory may be empty on a fresh database.
    let page = shopper
        .list_businesses(&DirectoryQuery {
            search: Some("Bean".into()),
            ..Default::default()
        })
        .await?;
    println!(
        "Public directory: {} approved listing(s) matching 'Bean'",
        page.total
    );

    if let Some(business) = page.items.first() {
        let toggled = shopper.toggle_saved_deal(business.id).await?;
        println!("Saved deal toggled: saved={}", toggled.saved);
    } else if let Some(id) = first_id {
        println!(
            "Listing {} awaits approval; approve it as an admin and re-run to exercise saved deals.",
            id
        );
    }

    Ok(())
}
