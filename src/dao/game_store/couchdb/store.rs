use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;
use tracing::debug;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{GameEntity, MoveEntity, PieceEntity, UserEntity},
    storage::{StorageError, StorageResult},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CellBody, CouchGameDocument, CouchUserDocument, END_SUFFIX,
        GAME_PREFIX, GameBody, MoveBody, USER_PREFIX, game_doc_id, user_doc_id,
    },
};

/// Revision conflicts tolerated before a game update gives up.
const MAX_UPDATE_ATTEMPTS: u32 = 8;

/// Outcome of a read-modify-write step on a game document.
enum Mutation<T> {
    /// Nothing to write; return the value as is.
    Unchanged(T),
    /// Write the modified body back, then return the value.
    Changed(T),
}

/// CouchDB-backed [`GameStore`]; each game is a single revisioned document.
#[derive(Clone)]
pub struct CouchGameStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchGameStore {
    /// Build the HTTP client and create the database when it does not exist yet.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            database: Arc::from(config.database),
            auth: config
                .credentials
                .map(|(user, pass)| (Arc::<str>::from(user), Arc::<str>::from(pass))),
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.authorize(self.client.request(method, url))
    }

    fn database_request(&self, method: Method) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, self.database);
        self.authorize(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let response = self
            .database_request(Method::GET)
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .database_request(Method::PUT)
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                match create.status() {
                    status if status.is_success() => Ok(()),
                    // Another instance created it first.
                    StatusCode::PRECONDITION_FAILED => Ok(()),
                    status => Err(CouchDaoError::DatabaseStatus { database, status }),
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// PUT a document; `Ok(false)` when CouchDB rejects the revision with 409.
    async fn try_put<T>(&self, doc_id: &str, document: &T) -> CouchResult<bool>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(false),
            status if status.is_success() => Ok(true),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_new<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        if self.try_put(doc_id, document).await? {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: StatusCode::CONFLICT,
            })
        }
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc.map(|doc| (row.id, doc)))
            .map(|(id, doc)| {
                from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: id,
                    source,
                })
            })
            .collect()
    }

    async fn game_document(&self, id: Uuid) -> CouchResult<Option<CouchGameDocument>> {
        self.get_document(&game_doc_id(id)).await
    }

    /// Read-modify-write loop over one game document, retried on revision conflicts.
    async fn update_game<T, F>(&self, game_id: Uuid, mut mutate: F) -> StorageResult<T>
    where
        F: FnMut(Uuid, &mut GameBody) -> StorageResult<Mutation<T>>,
    {
        let doc_id = game_doc_id(game_id);

        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let mut document = self
                .game_document(game_id)
                .await?
                .ok_or(StorageError::MissingGame { id: game_id })?;

            match mutate(game_id, &mut document.game)? {
                Mutation::Unchanged(value) => return Ok(value),
                Mutation::Changed(value) => {
                    if self.try_put(&doc_id, &document).await? {
                        return Ok(value);
                    }
                    debug!(%game_id, attempt, "CouchDB revision conflict; re-reading game");
                }
            }
        }

        Err(CouchDaoError::UpdateContention {
            path: doc_id,
            attempts: MAX_UPDATE_ATTEMPTS,
        }
        .into())
    }

    async fn create_game(&self, player1: Uuid, player2: Uuid) -> CouchResult<GameEntity> {
        let game = GameEntity::new(player1, player2);
        let document = CouchGameDocument::from(game.clone());
        self.put_new(&document.id, &document).await?;
        Ok(game)
    }

    async fn add_piece(&self, piece: PieceEntity) -> StorageResult<()> {
        let cell = CellBody {
            player_id: piece.player_id,
            x: piece.x,
            y: piece.y,
        };
        self.update_game(piece.game_id, move |_, game| {
            if game.pieces.contains(&cell) {
                Ok(Mutation::Unchanged(()))
            } else {
                game.pieces.push(cell);
                Ok(Mutation::Changed(()))
            }
        })
        .await
    }

    async fn resolve_move(&self, game_id: Uuid, firer: Uuid, x: u8, y: u8) -> StorageResult<bool> {
        self.update_game(game_id, move |game_id, game| {
            let opponent = if game.player1 == firer {
                game.player2
            } else if game.player2 == firer {
                game.player1
            } else {
                return Err(StorageError::NotParticipant {
                    game_id,
                    player_id: firer,
                });
            };

            if game.has_move(firer, x, y) {
                return Err(StorageError::move_already_recorded(game_id, firer, x, y));
            }

            let hit = game
                .pieces
                .iter()
                .any(|cell| cell.player_id != firer && cell.x == x && cell.y == y);
            game.moves.push(MoveBody {
                player_id: firer,
                x,
                y,
                hit,
            });
            game.next_turn = opponent;
            Ok(Mutation::Changed(hit))
        })
        .await
    }

    async fn list_games(&self) -> CouchResult<Vec<GameEntity>> {
        let documents = self
            .list_documents::<CouchGameDocument>(GAME_PREFIX)
            .await?;
        let mut games = documents
            .iter()
            .map(CouchGameDocument::to_entity)
            .collect::<CouchResult<Vec<_>>>()?;
        games.sort_by_key(|game| game.created_at);
        Ok(games)
    }

    async fn list_users(&self) -> CouchResult<Vec<UserEntity>> {
        let documents = self
            .list_documents::<CouchUserDocument>(USER_PREFIX)
            .await?;
        let mut users = documents
            .into_iter()
            .map(UserEntity::try_from)
            .collect::<CouchResult<Vec<_>>>()?;
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn ping(&self) -> CouchResult<()> {
        let path = self.database.to_string();
        let response = self
            .database_request(Method::GET)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: path.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path,
                status: response.status(),
            })
        }
    }
}

impl GameStore for CouchGameStore {
    fn create_game(
        &self,
        player1: Uuid,
        player2: Uuid,
    ) -> BoxFuture<'static, StorageResult<GameEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .create_game(player1, player2)
                .await
                .map_err(Into::into)
        })
    }

    fn add_piece(&self, piece: PieceEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.add_piece(piece).await })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store.game_document(id).await?;
            Ok(document
                .as_ref()
                .map(CouchGameDocument::to_entity)
                .transpose()?)
        })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_games().await.map_err(Into::into) })
    }

    fn list_pieces(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PieceEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .game_document(game_id)
                .await?
                .map(|document| document.game.pieces_of(game_id, player_id))
                .unwrap_or_default())
        })
    }

    fn list_moves(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MoveEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .game_document(game_id)
                .await?
                .map(|document| document.game.moves_of(game_id, player_id))
                .unwrap_or_default())
        })
    }

    fn coordinate_already_fired(
        &self,
        game_id: Uuid,
        player_id: Uuid,
        x: u8,
        y: u8,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .game_document(game_id)
                .await?
                .is_some_and(|document| document.game.has_move(player_id, x, y)))
        })
    }

    fn resolve_move(
        &self,
        game_id: Uuid,
        firer: Uuid,
        x: u8,
        y: u8,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.resolve_move(game_id, firer, x, y).await })
    }

    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let document = CouchUserDocument::from(user);
            store
                .put_new(&document.id, &document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .get_document::<CouchUserDocument>(&user_doc_id(id))
                .await?;
            Ok(document.map(UserEntity::try_from).transpose()?)
        })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_users().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
