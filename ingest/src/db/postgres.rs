use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Command, PlayerId, ReplayPlayerId};
use patterns::{DetectionResult, DetectionValue, ScopeKey, ALGORITHM_VERSION};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, info};

use super::models::{ParsedReplay, PersistReport};
use super::ReplayStore;
use crate::error::StoreError;
use crate::files::FileCandidate;

/// Rows per multi-row command insert
const COMMAND_CHUNK: usize = 1000;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Drop every replay table and the migration history so the next
    /// migration run starts from scratch.
    pub async fn drop_schema(pool: &PgPool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            DROP TABLE IF EXISTS detected_patterns, commands, players, replays, refinery_schema_history CASCADE
            "#,
        )
        .execute(pool)
        .await?;
        info!("Dropped replay tables");
        Ok(())
    }

    async fn insert_replay(tx: &mut Transaction<'_, Postgres>, replay: &ParsedReplay) -> Result<i64, StoreError> {
        let header = &replay.header;
        let replay_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO replays (
                file_path, file_checksum, file_name, file_size, replay_date, title, host,
                map_name, map_width, map_height, duration_seconds, frame_count, engine,
                engine_version, game_speed, game_type, home_team_size, avail_slots_count
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING id
            "#,
        )
        .bind(replay.file.path_str())
        .bind(&replay.file.checksum)
        .bind(&replay.file.name)
        .bind(replay.file.size as i64)
        .bind(header.start_time)
        .bind(&header.title)
        .bind(&header.host)
        .bind(&header.map_name)
        .bind(i32::from(header.map_width))
        .bind(i32::from(header.map_height))
        .bind(header.duration_seconds() as i32)
        .bind(i64::from(header.frame_count))
        .bind(&header.engine)
        .bind(&header.engine_version)
        .bind(&header.game_speed)
        .bind(&header.game_type)
        .bind(i32::from(header.home_team_size))
        .bind(i16::from(header.avail_slots_count))
        .fetch_one(&mut **tx)
        .await?;
        Ok(replay_id)
    }

    /// Insert players and return the transient to durable id table
    async fn insert_players(
        tx: &mut Transaction<'_, Postgres>,
        replay_id: i64,
        replay: &ParsedReplay,
    ) -> Result<HashMap<ReplayPlayerId, PlayerId>, StoreError> {
        let mut ids = HashMap::with_capacity(replay.players.len());
        for player in &replay.players {
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO players (
                    replay_id, slot_id, player_id, name, race, type, color, team,
                    is_observer, apm, eapm, is_winner, start_location_x, start_location_y
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                RETURNING id
                "#,
            )
            .bind(replay_id)
            .bind(i32::from(player.slot_id))
            .bind(i16::from(player.id.0))
            .bind(&player.name)
            .bind(player.race.as_str())
            .bind(&player.player_type)
            .bind(&player.color)
            .bind(i16::from(player.team))
            .bind(player.is_observer)
            .bind(player.apm as i32)
            .bind(player.eapm as i32)
            .bind(player.is_winner)
            .bind(player.start_location.map(|(x, _)| x))
            .bind(player.start_location.map(|(_, y)| y))
            .fetch_one(&mut **tx)
            .await?;

            // computer players share an id; the first row wins
            if player.id.is_computer() && ids.contains_key(&player.id) {
                debug!("Computer player {} shares id {} with an earlier row", player.name, player.id);
            }
            ids.entry(player.id).or_insert(PlayerId(id));
        }
        Ok(ids)
    }

    async fn insert_commands(
        tx: &mut Transaction<'_, Postgres>,
        replay_id: i64,
        replay: &ParsedReplay,
        ids: &HashMap<ReplayPlayerId, PlayerId>,
    ) -> Result<usize, StoreError> {
        let mut rows: Vec<(PlayerId, &Command)> = Vec::with_capacity(replay.commands.len());
        let mut missing = HashSet::new();
        for command in &replay.commands {
            match ids.get(&command.player) {
                Some(id) => rows.push((*id, command)),
                None => {
                    missing.insert(command.player);
                }
            }
        }
        if !missing.is_empty() {
            let mut missing: Vec<_> = missing.into_iter().collect();
            missing.sort();
            return Err(StoreError::UnresolvedPlayers {
                path: replay.file.path_str(),
                source: patterns::UnresolvedPlayers(missing),
            });
        }

        for chunk in rows.chunks(COMMAND_CHUNK) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO commands (replay_id, player_id, frame, seconds, run_at, action_type, unit_type, x, y, \
                 is_queued, order_name, tech_name, upgrade_name, hotkey_type, hotkey_group, chat_message, leave_reason) ",
            );
            builder.push_values(chunk, |mut b, (player_id, command)| {
                b.push_bind(replay_id)
                    .push_bind(player_id.0)
                    .push_bind(i64::from(command.frame))
                    .push_bind(command.seconds as i32)
                    .push_bind(replay.header.time_at(command.seconds))
                    .push_bind(command.action.as_str())
                    .push_bind(command.unit_type.clone())
                    .push_bind(command.x)
                    .push_bind(command.y)
                    .push_bind(command.is_queued)
                    .push_bind(command.order_name.clone())
                    .push_bind(command.tech_name.clone())
                    .push_bind(command.upgrade_name.clone())
                    .push_bind(command.hotkey_type.clone())
                    .push_bind(command.hotkey_group.map(i16::from))
                    .push_bind(command.chat_message.clone())
                    .push_bind(command.leave_reason.clone());
            });
            builder.build().execute(&mut **tx).await?;
        }
        Ok(rows.len())
    }

    async fn insert_detections(
        tx: &mut Transaction<'_, Postgres>,
        replay_id: i64,
        detections: &[DetectionResult],
    ) -> Result<usize, StoreError> {
        if detections.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO detected_patterns (replay_id, pattern_name, level, team, player_id, \
             value_bool, value_int, value_string, value_timestamp, algorithm_version) ",
        );
        builder.push_values(detections, |mut b, detection| {
            let row = DetectionRow::from(detection);
            b.push_bind(replay_id)
                .push_bind(detection.pattern_name.clone())
                .push_bind(detection.scope().as_str())
                .push_bind(row.team)
                .push_bind(row.player_id)
                .push_bind(row.value_bool)
                .push_bind(row.value_int)
                .push_bind(row.value_string)
                .push_bind(row.value_timestamp)
                .push_bind(ALGORITHM_VERSION);
        });
        builder.push(" ON CONFLICT DO NOTHING");

        let result = builder.build().execute(&mut **tx).await?;
        Ok(result.rows_affected() as usize)
    }
}

/// Column values for one `detected_patterns` row
#[derive(Debug, Default)]
struct DetectionRow {
    team: Option<i16>,
    player_id: Option<i64>,
    value_bool: Option<bool>,
    value_int: Option<i64>,
    value_string: Option<String>,
    value_timestamp: Option<DateTime<Utc>>,
}

impl From<&DetectionResult> for DetectionRow {
    fn from(detection: &DetectionResult) -> Self {
        let mut row = DetectionRow::default();
        match &detection.key {
            ScopeKey::Replay => {}
            ScopeKey::Team(team) => row.team = Some(i16::from(*team)),
            ScopeKey::Player(player) => row.player_id = player.player_id.map(|id| id.0),
        }
        match &detection.value {
            DetectionValue::Bool(v) => row.value_bool = Some(*v),
            DetectionValue::Int(v) => row.value_int = Some(*v),
            DetectionValue::Text(v) => row.value_string = Some(v.clone()),
            DetectionValue::Time(v) => row.value_timestamp = Some(*v),
        }
        row
    }
}

#[async_trait]
impl ReplayStore for PostgresStore {
    async fn filter_existing(&self, candidates: Vec<FileCandidate>) -> Result<Vec<FileCandidate>, StoreError> {
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let paths: Vec<String> = candidates.iter().map(|c| c.path_str()).collect();
        let checksums: Vec<String> = candidates.iter().map(|c| c.checksum.clone()).collect();

        let existing: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT file_path, file_checksum
            FROM replays
            WHERE file_path = ANY($1) OR file_checksum = ANY($2)
            "#,
        )
        .bind(paths)
        .bind(checksums)
        .fetch_all(&self.pool)
        .await?;

        let known_paths: HashSet<String> = existing.iter().map(|(path, _)| path.clone()).collect();
        let known_checksums: HashSet<String> = existing.into_iter().map(|(_, checksum)| checksum).collect();

        Ok(candidates
            .into_iter()
            .filter(|c| !known_paths.contains(&c.path_str()) && !known_checksums.contains(&c.checksum))
            .collect())
    }

    async fn persist(&self, mut replay: ParsedReplay) -> Result<PersistReport, StoreError> {
        let mut tx = self.pool.begin().await?;

        let replay_id = Self::insert_replay(&mut tx, &replay).await?;
        let ids = Self::insert_players(&mut tx, replay_id, &replay).await?;
        let commands = Self::insert_commands(&mut tx, replay_id, &replay, &ids).await?;

        patterns::remap_player_ids(&mut replay.detections, &ids).map_err(|source| {
            StoreError::UnresolvedPlayers {
                path: replay.file.path_str(),
                source,
            }
        })?;
        let detections = Self::insert_detections(&mut tx, replay_id, &replay.detections).await?;

        tx.commit().await?;

        debug!(
            "Stored replay {} as id {} ({} commands, {} detections)",
            replay.file.name, replay_id, commands, detections
        );

        Ok(PersistReport {
            replay_id,
            players: ids.len(),
            commands,
            detections,
        })
    }

    fn name(&self) -> &'static str {
        "postgresql"
    }
}
