pub mod collection;
pub mod memory;

pub use collection::{Collection, Entity, MongoCollection, Page};
pub use memory::MemoryCollection;

use crate::models::{
    DbContact, DbEngagement, DbOrganization, DbService, DbServiceAnswer, DbTag, DbTagGroup, DbUser,
};
use mongodb::{Client, Database};
use std::error::Error;
use std::sync::Arc;

pub const USERS: &str = "users";
pub const ORGANIZATIONS: &str = "organizations";
pub const CONTACTS: &str = "contacts";
pub const ENGAGEMENTS: &str = "engagements";
pub const TAGS: &str = "tags";
pub const TAG_GROUPS: &str = "tag_groups";
pub const SERVICES: &str = "services";
pub const SERVICE_ANSWERS: &str = "service_answers";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));
        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .split('/')
            .last()
            .and_then(|s| s.split('?').next())
            .filter(|s| !s.is_empty() && !s.contains(':'))
            .unwrap_or("greenlight");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the lookup indexes every collection is queried by.
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::{doc, Document};
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let indexed: [(&str, Document); 13] = [
            (USERS, doc! { "id": 1 }),
            (USERS, doc! { "email": 1 }),
            (USERS, doc! { "user_name": 1 }),
            (USERS, doc! { "roles.org_id": 1 }),
            (ORGANIZATIONS, doc! { "id": 1 }),
            (CONTACTS, doc! { "id": 1 }),
            (CONTACTS, doc! { "org_id": 1 }),
            (ENGAGEMENTS, doc! { "id": 1 }),
            (ENGAGEMENTS, doc! { "org_id": 1, "status": 1 }),
            (TAGS, doc! { "org_id": 1 }),
            (TAG_GROUPS, doc! { "org_id": 1, "category": 1 }),
            (SERVICES, doc! { "org_id": 1 }),
            (SERVICE_ANSWERS, doc! { "service_id": 1 }),
        ];

        for (collection, keys) in indexed {
            let label = format!("{}({})", collection, keys.keys().cloned().collect::<Vec<_>>().join(", "));
            let index = IndexModel::builder().keys(keys).build();
            match self.db.collection::<Document>(collection).create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: {}", label),
                Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
            }
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> mongodb::Collection<T> {
        self.db.collection(name)
    }

    pub async fn health_check(&self) -> bool {
        self.db.list_collection_names().await.is_ok()
    }
}

/// One handle per document collection, shared by every interactor.
#[derive(Clone)]
pub struct Collections {
    pub users: Arc<dyn Collection<DbUser>>,
    pub organizations: Arc<dyn Collection<DbOrganization>>,
    pub contacts: Arc<dyn Collection<DbContact>>,
    pub engagements: Arc<dyn Collection<DbEngagement>>,
    pub tags: Arc<dyn Collection<DbTag>>,
    pub tag_groups: Arc<dyn Collection<DbTagGroup>>,
    pub services: Arc<dyn Collection<DbService>>,
    pub service_answers: Arc<dyn Collection<DbServiceAnswer>>,
}

impl Collections {
    pub fn mongo(db: &MongoDB) -> Self {
        Collections {
            users: Arc::new(MongoCollection::new(db.collection(USERS))),
            organizations: Arc::new(MongoCollection::new(db.collection(ORGANIZATIONS))),
            contacts: Arc::new(MongoCollection::new(db.collection(CONTACTS))),
            engagements: Arc::new(MongoCollection::new(db.collection(ENGAGEMENTS))),
            tags: Arc::new(MongoCollection::new(db.collection(TAGS))),
            tag_groups: Arc::new(MongoCollection::new(db.collection(TAG_GROUPS))),
            services: Arc::new(MongoCollection::new(db.collection(SERVICES))),
            service_answers: Arc::new(MongoCollection::new(db.collection(SERVICE_ANSWERS))),
        }
    }

    pub fn memory() -> Self {
        Collections {
            users: Arc::new(MemoryCollection::<DbUser>::new()),
            organizations: Arc::new(MemoryCollection::<DbOrganization>::new()),
            contacts: Arc::new(MemoryCollection::<DbContact>::new()),
            engagements: Arc::new(MemoryCollection::<DbEngagement>::new()),
            tags: Arc::new(MemoryCollection::<DbTag>::new()),
            tag_groups: Arc::new(MemoryCollection::<DbTagGroup>::new()),
            services: Arc::new(MemoryCollection::<DbService>::new()),
            service_answers: Arc::new(MemoryCollection::<DbServiceAnswer>::new()),
        }
    }
}
