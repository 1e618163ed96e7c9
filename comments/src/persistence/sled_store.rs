use crate::models::{Comment, CommentId, CustomerId, NewComment, OrderDetail, ProductId, Rating};
use crate::ports::{CommentRepository, OrderDetailRepository, Store, UnitOfWork};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Error, Result};
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;

const COMMENTS_TREE: &str = "comments";
const COMMENTS_BY_PRODUCT_TREE: &str = "comments_by_product";
const ORDER_DETAILS_TREE: &str = "order_details";

/// Sled-backed comment store
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    comments: Tree,
    comments_by_product: Tree,
    order_details: Tree,
}

impl SledStore {
    /// Open (or create) the store at `path`.
    /// Creates the parent directory if it doesn't exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Internal(format!("Failed to create directory: {}", e)))?;
        }

        let db = sled::open(path).map_err(storage("Failed to open Sled database"))?;

        Ok(Self {
            comments: db
                .open_tree(COMMENTS_TREE)
                .map_err(storage("Failed to open comments tree"))?,
            comments_by_product: db
                .open_tree(COMMENTS_BY_PRODUCT_TREE)
                .map_err(storage("Failed to open product index"))?,
            order_details: db
                .open_tree(ORDER_DETAILS_TREE)
                .map_err(storage("Failed to open order details tree"))?,
            db,
        })
    }

    fn load_comment(&self, id: CommentId) -> Result<Option<Comment>> {
        match self
            .comments
            .get(id.to_be_bytes())
            .map_err(storage("Failed to get comment"))?
        {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn next_comment_id(&self) -> Result<CommentId> {
        // sled ids start at zero
        let id = self
            .db
            .generate_id()
            .map_err(storage("Failed to allocate comment id"))?;
        Ok(id + 1)
    }
}

impl Store for SledStore {
    fn begin(&self) -> Box<dyn UnitOfWork> {
        Box::new(SledUnitOfWork::new(self.clone()))
    }
}

enum Change {
    PutComment(Comment),
    RemoveComment(CommentId),
    PutOrderDetail(OrderDetail),
}

/// Encoded form of a change, ready to apply inside a transaction
enum Staged {
    PutComment {
        id: CommentId,
        product_id: ProductId,
        bytes: Vec<u8>,
    },
    RemoveComment {
        id: CommentId,
    },
    PutOrderDetail {
        key: Vec<u8>,
        bytes: Vec<u8>,
    },
}

/// Unit of work over a `SledStore`.
/// Reads see committed data only; writes wait for `commit`.
pub struct SledUnitOfWork {
    store: SledStore,
    pending: Mutex<Vec<Change>>,
}

impl SledUnitOfWork {
    pub fn new(store: SledStore) -> Self {
        Self {
            store,
            pending: Mutex::new(Vec::new()),
        }
    }

    fn stage(&self, change: Change) {
        self.pending.lock().push(change);
    }

    pub fn pending_changes(&self) -> usize {
        self.pending.lock().len()
    }
}

#[async_trait]
impl CommentRepository for SledUnitOfWork {
    async fn add(&self, comment: NewComment) -> Result<Comment> {
        let comment = comment.into_comment(self.store.next_comment_id()?);
        self.stage(Change::PutComment(comment.clone()));
        Ok(comment)
    }

    async fn get_by_id(&self, id: CommentId) -> Result<Option<Comment>> {
        self.store.load_comment(id)
    }

    async fn update(&self, comment: Comment) -> Result<()> {
        // Check if comment exists
        if !self
            .store
            .comments
            .contains_key(comment.id.to_be_bytes())
            .map_err(storage("Failed to check comment"))?
        {
            return Err(Error::NotFound);
        }

        self.stage(Change::PutComment(comment));
        Ok(())
    }

    async fn delete(&self, comment: &Comment) -> Result<()> {
        self.stage(Change::RemoveComment(comment.id));
        Ok(())
    }

    async fn get_by_product(&self, product_id: ProductId) -> Result<Vec<Comment>> {
        let mut comments = Vec::new();

        for item in self
            .store
            .comments_by_product
            .scan_prefix(product_id.to_be_bytes())
        {
            let (key, _) = item.map_err(storage("Failed to iterate product index"))?;
            let id = comment_id_from_index_key(&key)?;

            // Index entries without a record are skipped
            if let Some(comment) = self.store.load_comment(id)? {
                comments.push(comment);
            }
        }

        Ok(comments)
    }

    async fn get_by_rating(&self, product_id: ProductId, rating: Rating) -> Result<Vec<Comment>> {
        let mut comments = self.get_by_product(product_id).await?;
        comments.retain(|c| c.rating == rating);
        Ok(comments)
    }
}

#[async_trait]
impl OrderDetailRepository for SledUnitOfWork {
    async fn has_completed_purchase(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
    ) -> Result<bool> {
        for item in self
            .store
            .order_details
            .scan_prefix(purchase_prefix(customer_id, product_id))
        {
            let (_, bytes) = item.map_err(storage("Failed to iterate order details"))?;
            let detail: OrderDetail = decode(&bytes)?;
            if detail.is_completed() {
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn save(&self, detail: OrderDetail) -> Result<()> {
        self.stage(Change::PutOrderDetail(detail));
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for SledUnitOfWork {
    fn comments(&self) -> &dyn CommentRepository {
        self
    }

    fn order_details(&self) -> &dyn OrderDetailRepository {
        self
    }

    async fn commit(&self) -> Result<()> {
        let changes = std::mem::take(&mut *self.pending.lock());
        if changes.is_empty() {
            return Ok(());
        }

        let staged = changes
            .into_iter()
            .map(|change| -> Result<Staged> {
                Ok(match change {
                    Change::PutComment(comment) => Staged::PutComment {
                        id: comment.id,
                        product_id: comment.product_id,
                        bytes: encode(&comment)?,
                    },
                    Change::RemoveComment(id) => Staged::RemoveComment { id },
                    Change::PutOrderDetail(detail) => Staged::PutOrderDetail {
                        key: order_detail_key(&detail),
                        bytes: encode(&detail)?,
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let store = &self.store;
        (
            &store.comments,
            &store.comments_by_product,
            &store.order_details,
        )
            .transaction(
                |(comments, by_product, order_details)| -> ConflictableTransactionResult<(), Error> {
                    for change in &staged {
                        match change {
                            Staged::PutComment {
                                id,
                                product_id,
                                bytes,
                            } => {
                                let previous =
                                    comments.insert(&id.to_be_bytes()[..], bytes.as_slice())?;

                                // Drop the old index entry when the product changed
                                if let Some(previous) = previous {
                                    let previous: Comment = decode(&previous)
                                        .map_err(ConflictableTransactionError::Abort)?;
                                    by_product.remove(index_key(previous.product_id, *id))?;
                                }
                                by_product.insert(index_key(*product_id, *id), Vec::<u8>::new())?;
                            }
                            Staged::RemoveComment { id } => {
                                if let Some(previous) = comments.remove(&id.to_be_bytes()[..])? {
                                    let previous: Comment = decode(&previous)
                                        .map_err(ConflictableTransactionError::Abort)?;
                                    by_product.remove(index_key(previous.product_id, *id))?;
                                }
                            }
                            Staged::PutOrderDetail { key, bytes } => {
                                order_details.insert(key.as_slice(), bytes.as_slice())?;
                            }
                        }
                    }
                    Ok(())
                },
            )
            .map_err(|e| match e {
                TransactionError::Abort(err) => err,
                TransactionError::Storage(err) => {
                    Error::Storage(format!("Failed to commit changes: {}", err))
                }
            })?;

        store
            .db
            .flush()
            .map_err(storage("Failed to flush database"))?;

        Ok(())
    }
}

fn storage(context: &'static str) -> impl Fn(sled::Error) -> Error {
    move |e| Error::Storage(format!("{}: {}", context, e))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| Error::Serialization(format!("Failed to serialize record: {}", e)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| Error::Serialization(format!("Failed to deserialize record: {}", e)))
}

/// product ‖ comment id, big-endian so a prefix scan walks ids in order
fn index_key(product_id: ProductId, id: CommentId) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&product_id.to_be_bytes());
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn comment_id_from_index_key(key: &[u8]) -> Result<CommentId> {
    let raw: [u8; 8] = key
        .get(8..16)
        .and_then(|tail| tail.try_into().ok())
        .ok_or_else(|| Error::Internal(format!("Malformed product index key: {:?}", key)))?;
    Ok(CommentId::from_be_bytes(raw))
}

fn purchase_prefix(customer_id: CustomerId, product_id: ProductId) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(&customer_id.to_be_bytes());
    key.extend_from_slice(&product_id.to_be_bytes());
    key
}

fn order_detail_key(detail: &OrderDetail) -> Vec<u8> {
    let mut key = purchase_prefix(detail.customer_id, detail.product_id);
    key.extend_from_slice(&detail.order_id.to_be_bytes());
    key
}
