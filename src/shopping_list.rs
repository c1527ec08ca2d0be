//! Per-session shopping lists held in memory.

use std::collections::HashMap;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::listing::{ProductListing, PRICE_NOT_AVAILABLE};

/// An entry on a shopping list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub title: String,
    pub price: String,
    pub url: String,
    pub source: String,
    pub added_at: DateTime<Utc>,
}

/// Item fields as submitted by a client. Missing fields get placeholders.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
}

impl From<&ProductListing> for NewItem {
    fn from(listing: &ProductListing) -> Self {
        Self {
            title: listing.title.clone(),
            price: listing.price.clone(),
            url: listing.url.clone(),
            source: listing.source.clone(),
        }
    }
}

fn or_placeholder(value: String, placeholder: &str) -> String {
    if value.trim().is_empty() {
        placeholder.to_string()
    } else {
        value
    }
}

/// One session's list.
#[derive(Debug, Clone, Default)]
pub struct ShoppingList {
    items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[ShoppingListItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add an item. Returns `false` if an item with the same URL is already listed.
    pub fn add(&mut self, item: NewItem) -> bool {
        let url = item.url.trim().to_string();
        if !url.is_empty() && self.items.iter().any(|i| i.url == url) {
            return false;
        }
        self.items.push(ShoppingListItem {
            title: or_placeholder(item.title, "Product"),
            price: or_placeholder(item.price, PRICE_NOT_AVAILABLE),
            url,
            source: or_placeholder(item.source, "Unknown"),
            added_at: Utc::now(),
        });
        true
    }

    /// Remove the item at `index`.
    pub fn remove(&mut self, index: usize) -> Result<ShoppingListItem> {
        if index >= self.items.len() {
            return Err(Error::NotFound(format!("list item {}", index)));
        }
        Ok(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Plain-text export, stamped with the current local time.
    ///
    /// Returns `None` when there is nothing to export.
    pub fn export_text(&self) -> Option<String> {
        self.export_text_at(Local::now())
    }

    fn export_text_at(&self, generated: DateTime<Local>) -> Option<String> {
        if self.items.is_empty() {
            return None;
        }
        let mut out = String::from("🛒 My Shopping List\n");
        out.push_str(&"=".repeat(30));
        out.push_str("\n\n");
        for (i, item) in self.items.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, item.title));
            out.push_str(&format!("   💰 Price: {}\n", item.price));
            out.push_str(&format!("   🏪 Store: {}\n", item.source));
            if !item.url.is_empty() {
                out.push_str(&format!("   🔗 Link: {}\n", item.url));
            }
            out.push('\n');
        }
        out.push_str(&format!(
            "Generated on: {}\n",
            generated.format("%Y-%m-%d %H:%M:%S")
        ));
        Some(out)
    }
}

/// Shopping lists keyed by session id.
#[derive(Debug, Default)]
pub struct ShoppingLists {
    sessions: RwLock<HashMap<String, ShoppingList>>,
}

impl ShoppingLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new empty session and return its id.
    pub async fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .await
            .insert(id.clone(), ShoppingList::new());
        id
    }

    /// Run `f` against a session's list.
    pub async fn with_list<T>(
        &self,
        session: &str,
        f: impl FnOnce(&mut ShoppingList) -> T,
    ) -> Result<T> {
        let mut sessions = self.sessions.write().await;
        let list = sessions
            .get_mut(session)
            .ok_or_else(|| Error::NotFound(format!("session {}", session)))?;
        Ok(f(list))
    }

    /// Drop a session entirely.
    pub async fn remove_session(&self, session: &str) -> Result<()> {
        self.sessions
            .write()
            .await
            .remove(session)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("session {}", session)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(title: &str, url: &str) -> NewItem {
        NewItem {
            title: title.to_string(),
            price: "₹56".to_string(),
            url: url.to_string(),
            source: "bigbasket.com".to_string(),
        }
    }

    #[test]
    fn test_add_dedups_by_url() {
        let mut list = ShoppingList::new();
        assert!(list.add(item("Milk", "https://bb.in/milk")));
        assert!(!list.add(item("Milk again", "https://bb.in/milk")));
        assert!(list.add(item("Curd", "https://bb.in/curd")));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_items_without_url_are_not_deduped() {
        let mut list = ShoppingList::new();
        assert!(list.add(item("Loose tomatoes", "")));
        assert!(list.add(item("Loose tomatoes", "")));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_missing_fields_get_placeholders() {
        let mut list = ShoppingList::new();
        list.add(NewItem::default());
        let added = &list.items()[0];
        assert_eq!(added.title, "Product");
        assert_eq!(added.price, PRICE_NOT_AVAILABLE);
        assert_eq!(added.source, "Unknown");
    }

    #[test]
    fn test_remove_and_clear() {
        let mut list = ShoppingList::new();
        list.add(item("Milk", "https://bb.in/milk"));
        list.add(item("Curd", "https://bb.in/curd"));

        let removed = list.remove(0).unwrap();
        assert_eq!(removed.title, "Milk");
        assert_eq!(list.items()[0].title, "Curd");
        assert!(matches!(list.remove(5), Err(Error::NotFound(_))));

        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn test_export_text_layout() {
        let mut list = ShoppingList::new();
        list.add(item("Toned Milk 1L", "https://bb.in/milk"));
        list.add(NewItem {
            title: "Spinach".to_string(),
            price: "₹30".to_string(),
            ..NewItem::default()
        });

        let generated = Local.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        let text = list.export_text_at(generated).unwrap();
        let expected = "🛒 My Shopping List\n\
            ==============================\n\n\
            1. Toned Milk 1L\n   💰 Price: ₹56\n   🏪 Store: bigbasket.com\n   🔗 Link: https://bb.in/milk\n\n\
            2. Spinach\n   💰 Price: ₹30\n   🏪 Store: Unknown\n\n\
            Generated on: 2026-03-14 09:30:00\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_export_text_empty_list_is_none() {
        let mut list = ShoppingList::new();
        assert!(list.export_text().is_none());

        list.add(item("Toned Milk 1L", "https://bb.in/milk"));
        list.clear();
        assert!(list.export_text().is_none());
    }

    #[test]
    fn test_from_listing() {
        let listing = ProductListing {
            title: "Paneer".to_string(),
            description: "fresh".to_string(),
            price: "₹90".to_string(),
            url: "https://catalog.local/products/paneer".to_string(),
            source: "Local Catalog".to_string(),
            relevance_score: 0.3,
        };
        let mut list = ShoppingList::new();
        list.add(NewItem::from(&listing));
        assert_eq!(list.items()[0].url, listing.url);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let lists = ShoppingLists::new();
        let a = lists.create_session().await;
        let b = lists.create_session().await;
        assert_ne!(a, b);

        lists
            .with_list(&a, |l| l.add(item("Milk", "https://bb.in/milk")))
            .await
            .unwrap();
        assert_eq!(lists.with_list(&a, |l| l.len()).await.unwrap(), 1);
        assert_eq!(lists.with_list(&b, |l| l.len()).await.unwrap(), 0);

        lists.remove_session(&a).await.unwrap();
        assert!(matches!(
            lists.with_list(&a, |l| l.len()).await,
            Err(Error::NotFound(_))
        ));
        assert!(lists.remove_session(&a).await.is_err());
    }
}
