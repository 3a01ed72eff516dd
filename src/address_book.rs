//! # Address Book
//!
//! Reference service used by the CLI and the end-to-end tests, in both
//! dispatch styles:
//!
//! - [`AddressBook`] is a [`ServiceEntity`] whose methods are called by name
//! - [`AddressBookAction`] is an [`Action`] switching on the request verb
//!
//! Both can share one [`BookStore`], so the two styles see the same books.

use crate::definition::ServiceDefinition;
use crate::entity::{Action, ActionContext, EntityError, MethodRegistry, ServiceEntity};
use crate::generator::ServiceDefinitionGenerator;
use crate::handler::{HandlerError, HttpMethod, ServiceHandler};
use crate::media::MediaType;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Book id to entries.
pub type BookStore = Arc<DashMap<String, Vec<String>>>;

/// JSON body accepted by the action style's POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBookUpdate {
    pub entries: Vec<String>,
}

fn missing(id: &str) -> EntityError {
    EntityError::illegal_state(format!("No AddressBook created for {id}"))
}

/// Address books as an entity with named methods.
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    books: BookStore,
}

impl AddressBook {
    pub fn with_store(books: BookStore) -> Self {
        Self { books }
    }

    pub fn store(&self) -> &BookStore {
        &self.books
    }

    /// Create (or reset) the book `id`.
    pub fn create(&self, id: &str) -> Result<(), EntityError> {
        self.books.insert(id.to_string(), Vec::new());
        debug!(book = %id, "Address book created");
        Ok(())
    }

    /// Append `entries` to the book under its entry lock and return the result.
    pub fn append(&self, id: &str, entries: &[&str]) -> Result<Vec<String>, EntityError> {
        let mut book = self.books.get_mut(id).ok_or_else(|| missing(id))?;
        book.extend(entries.iter().map(|e| e.to_string()));
        Ok(book.clone())
    }

    pub fn entries(&self, id: &str) -> Result<Vec<String>, EntityError> {
        self.books
            .get(id)
            .map(|book| book.clone())
            .ok_or_else(|| missing(id))
    }

    /// Remove the book and return its last entries.
    pub fn remove(&self, id: &str) -> Result<Vec<String>, EntityError> {
        self.books
            .remove(id)
            .map(|(_, entries)| entries)
            .ok_or_else(|| missing(id))
    }
}

impl ServiceEntity for AddressBook {
    fn register(registry: &mut MethodRegistry<Self>) {
        registry
            .unary("createAddressBook", |book, id| book.create(id))
            .binary("updateAddressBook", |book, id, update| {
                book.append(id, &[update])
            })
            .ternary("updateAddressBook", |book, id, update, update2| {
                book.append(id, &[update, update2])
            })
            .unary("getAddressBook", |book, id| book.entries(id))
            .unary("deleteAddressBook", |book, id| book.remove(id));
    }
}

/// Address books as a single verb-switching action.
#[derive(Debug, Clone, Default)]
pub struct AddressBookAction {
    book: AddressBook,
}

impl AddressBookAction {
    pub fn with_store(books: BookStore) -> Self {
        Self {
            book: AddressBook::with_store(books),
        }
    }
}

impl Action for AddressBookAction {
    fn name(&self) -> &str {
        "addressBookAction"
    }

    fn action(&self, ctx: &ActionContext) -> Result<Value, EntityError> {
        let id = ctx.path_value();
        match ctx.method() {
            HttpMethod::Put => {
                self.book.create(id)?;
                Ok(Value::Null)
            }
            HttpMethod::Get | HttpMethod::Head => Ok(json!(self.book.entries(id)?)),
            HttpMethod::Delete => Ok(json!(self.book.remove(id)?)),
            HttpMethod::Post => {
                let mut updates: Vec<String> = ["update", "update2"]
                    .iter()
                    .filter_map(|name| ctx.form_param(name))
                    .map(str::to_string)
                    .collect();
                if ctx.body().is_some() {
                    updates.extend(ctx.body_as::<AddressBookUpdate>()?.entries);
                }
                if updates.is_empty() {
                    return Err(EntityError::invalid_argument("no entries to add"));
                }
                let refs: Vec<&str> = updates.iter().map(String::as_str).collect();
                Ok(json!(self.book.append(id, &refs)?))
            }
        }
    }
}

/// Public view of a book: `{"entries": "a - b - "}`.
pub fn address_book_view(value: Value) -> Value {
    match value {
        Value::Array(entries) => {
            let mut joined = String::new();
            for entry in &entries {
                match entry {
                    Value::String(s) => joined.push_str(s),
                    other => joined.push_str(&other.to_string()),
                }
                joined.push_str(" - ");
            }
            json!({ "entries": joined })
        }
        other => other,
    }
}

fn address_book_handlers(form_params: &[&str]) -> Result<Vec<ServiceHandler>, HandlerError> {
    let mut update = ServiceHandler::post(None, "updateAddressBook")
        .consume_with::<AddressBookUpdate>(MediaType::APPLICATION_JSON);
    for name in form_params {
        update = update.add_form_param(name)?;
    }
    Ok(vec![
        ServiceHandler::put(None, "createAddressBook"),
        update,
        ServiceHandler::get(None, "getAddressBook")
            .producing(MediaType::APPLICATION_JSON)
            .producing(MediaType::APPLICATION_XML)
            .producing(MediaType::TEXT_PLAIN)
            .visiting(address_book_view),
        ServiceHandler::delete(None, "deleteAddressBook"),
    ])
}

/// Entity-style address book at `base_path`.
///
/// `form_params` are the POST form fields of `updateAddressBook`, passed to
/// the overload of matching arity.
pub fn address_book_definition(
    generator: Arc<dyn ServiceDefinitionGenerator>,
    base_path: &str,
    book: AddressBook,
    form_params: &[&str],
) -> Result<ServiceDefinition, HandlerError> {
    let definition = address_book_handlers(form_params)?.into_iter().fold(
        ServiceDefinition::new(generator)
            .with_path(base_path)
            .using_entity(book)
            .producing(MediaType::APPLICATION_JSON)
            .producing(MediaType::APPLICATION_XML),
        ServiceDefinition::with_handler,
    );
    Ok(definition)
}

/// Action-style address book at `base_path`; every handler goes to `action`.
pub fn address_book_action_definition(
    generator: Arc<dyn ServiceDefinitionGenerator>,
    base_path: &str,
    action: AddressBookAction,
    form_params: &[&str],
) -> Result<ServiceDefinition, HandlerError> {
    let definition = address_book_handlers(form_params)?.into_iter().fold(
        ServiceDefinition::new(generator)
            .with_path(base_path)
            .using_delegate(action)
            .producing(MediaType::APPLICATION_JSON)
            .producing(MediaType::APPLICATION_XML),
        ServiceDefinition::with_handler,
    );
    Ok(definition)
}
