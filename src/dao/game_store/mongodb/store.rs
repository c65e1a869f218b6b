use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Collection, Database, bson::doc, options::IndexOptions};
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        GAME_COLLECTION_NAME, MongoGameDocument, MongoUserDocument, USER_COLLECTION_NAME,
        cell_match, doc_id,
    },
};
use crate::dao::{
    game_store::GameStore,
    models::{GameEntity, MoveEntity, PieceEntity, UserEntity},
    storage::{StorageError, StorageResult},
};

/// MongoDB-backed [`GameStore`] implementation.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: Database,
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = establish_connection(&config.options, &config.database_name).await?;

        let store = Self {
            inner: Arc::new(MongoInner { database }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self
            .inner
            .database
            .collection::<mongodb::bson::Document>(GAME_COLLECTION_NAME);
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"player1": 1, "player2": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("game_players_idx".to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GAME_COLLECTION_NAME,
                index: "player1,player2",
                source,
            })?;

        Ok(())
    }

    fn games(&self) -> Collection<MongoGameDocument> {
        self.inner
            .database
            .collection::<MongoGameDocument>(GAME_COLLECTION_NAME)
    }

    fn users(&self) -> Collection<MongoUserDocument> {
        self.inner
            .database
            .collection::<MongoUserDocument>(USER_COLLECTION_NAME)
    }

    async fn ping(&self) -> MongoResult<()> {
        self.inner
            .database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn create_game(&self, player1: Uuid, player2: Uuid) -> MongoResult<GameEntity> {
        let game = GameEntity::new(player1, player2);
        let document: MongoGameDocument = game.clone().into();
        self.games()
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::CreateGame {
                id: game.id,
                source,
            })?;
        // Round-trip through BSON so the returned timestamp matches what was stored.
        document.to_entity()
    }

    async fn game_document(&self, id: Uuid) -> MongoResult<Option<MongoGameDocument>> {
        self.games()
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })
    }

    async fn add_piece(&self, piece: PieceEntity) -> StorageResult<()> {
        let id = piece.game_id;
        let result = self
            .games()
            .update_one(
                doc_id(id),
                doc! {"$addToSet": {"pieces": cell_match(piece.player_id, piece.x, piece.y)}},
            )
            .await
            .map_err(|source| MongoDaoError::AddPiece { id, source })?;

        if result.matched_count == 0 {
            return Err(StorageError::MissingGame { id });
        }
        Ok(())
    }

    async fn list_games(&self) -> MongoResult<Vec<GameEntity>> {
        let documents: Vec<MongoGameDocument> = self
            .games()
            .find(doc! {})
            .sort(doc! { "created_at": 1, "_id": 1 })
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?;

        documents.iter().map(MongoGameDocument::to_entity).collect()
    }

    async fn list_pieces(&self, game_id: Uuid, player_id: Uuid) -> MongoResult<Vec<PieceEntity>> {
        Ok(self
            .game_document(game_id)
            .await?
            .map(|document| document.pieces_of(game_id, player_id))
            .unwrap_or_default())
    }

    async fn list_moves(&self, game_id: Uuid, player_id: Uuid) -> MongoResult<Vec<MoveEntity>> {
        Ok(self
            .game_document(game_id)
            .await?
            .map(|document| document.moves_of(game_id, player_id))
            .unwrap_or_default())
    }

    async fn coordinate_already_fired(
        &self,
        game_id: Uuid,
        player_id: Uuid,
        x: u8,
        y: u8,
    ) -> MongoResult<bool> {
        let count = self
            .games()
            .count_documents(doc! {
                "_id": game_id.to_string(),
                "moves": {"$elemMatch": cell_match(player_id, x, y)},
            })
            .await
            .map_err(|source| MongoDaoError::LoadGame { id: game_id, source })?;
        Ok(count > 0)
    }

    async fn resolve_move(&self, game_id: Uuid, firer: Uuid, x: u8, y: u8) -> StorageResult<bool> {
        let document = self
            .game_document(game_id)
            .await?
            .ok_or(StorageError::MissingGame { id: game_id })?;
        let game = document.to_entity()?;
        let opponent = game
            .opponent_of(firer)
            .ok_or(StorageError::NotParticipant {
                game_id,
                player_id: firer,
            })?;

        // Pieces never change after creation, so the hit flag computed from this read
        // stays valid for the conditional write below.
        let hit = document.opposing_piece_at(firer, x, y);

        let mut recorded = cell_match(firer, x, y);
        recorded.insert("hit", hit);

        let result = self
            .games()
            .update_one(
                doc! {
                    "_id": game_id.to_string(),
                    "moves": {"$not": {"$elemMatch": cell_match(firer, x, y)}},
                },
                doc! {
                    "$push": {"moves": recorded},
                    "$set": {"next_turn": opponent.to_string()},
                },
            )
            .await
            .map_err(|source| MongoDaoError::RecordMove {
                id: game_id,
                source,
            })?;

        if result.matched_count == 0 {
            return Err(StorageError::move_already_recorded(game_id, firer, x, y));
        }
        Ok(hit)
    }

    async fn create_user(&self, user: UserEntity) -> MongoResult<()> {
        let id = user.id;
        let document: MongoUserDocument = user.into();
        self.users()
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::CreateUser { id, source })?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> MongoResult<Option<UserEntity>> {
        self.users()
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadUser { id, source })?
            .map(UserEntity::try_from)
            .transpose()
    }

    async fn list_users(&self) -> MongoResult<Vec<UserEntity>> {
        let documents: Vec<MongoUserDocument> = self
            .users()
            .find(doc! {})
            .sort(doc! { "name": 1, "_id": 1 })
            .await
            .map_err(|source| MongoDaoError::ListUsers { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListUsers { source })?;

        documents.into_iter().map(UserEntity::try_from).collect()
    }
}

impl GameStore for MongoGameStore {
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
                .map(MongoGameDocument::to_entity)
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
            store
                .list_pieces(game_id, player_id)
                .await
                .map_err(Into::into)
        })
    }

    fn list_moves(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MoveEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_moves(game_id, player_id)
                .await
                .map_err(Into::into)
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
            store
                .coordinate_already_fired(game_id, player_id, x, y)
                .await
                .map_err(Into::into)
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
        Box::pin(async move { store.create_user(user).await.map_err(Into::into) })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user(id).await.map_err(Into::into) })
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
