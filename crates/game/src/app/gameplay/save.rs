const SAVE_VERSION: u32 = 1;
pub(crate) const SAVE_SLOT_FILE: &str = "slot0.json";

#[derive(Debug, Error)]
pub(crate) enum SaveError {
    #[error("{action} save '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("encode save json: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("parse save json at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("validation failed at save_version: expected {expected}, got {actual}")]
    Version { expected: u32, actual: u32 },
    #[error("validation failed at checksum: expected {expected}, got {actual}")]
    Checksum { expected: String, actual: String },
    #[error("validation failed at {path}: {message}")]
    Invalid { path: String, message: String },
}

/// One save slot: the running module, the hall scene number and every
/// variable, sealed with a checksum over the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SaveGame {
    pub(crate) save_version: u32,
    pub(crate) module: ModuleId,
    pub(crate) scene_num: i32,
    pub(crate) vars: Vec<SavedVar>,
    pub(crate) checksum: String,
}

#[derive(Serialize)]
struct SealedFields<'a> {
    module: ModuleId,
    scene_num: i32,
    vars: &'a [SavedVar],
}

impl SaveGame {
    pub(crate) fn capture(services: &Services, module: ModuleId) -> Result<Self, SaveError> {
        let vars = services.vars.to_saved();
        let scene_num = services.game_state.scene_num;
        let checksum = seal(module, scene_num, &vars)?;
        Ok(Self {
            save_version: SAVE_VERSION,
            module,
            scene_num,
            vars,
            checksum,
        })
    }
}

fn seal(module: ModuleId, scene_num: i32, vars: &[SavedVar]) -> Result<String, SaveError> {
    let canonical = serde_json::to_vec(&SealedFields {
        module,
        scene_num,
        vars,
    })
    .map_err(SaveError::Encode)?;
    Ok(sha256_hex(&canonical))
}

pub(crate) fn save_path(saves_dir: &Path) -> PathBuf {
    saves_dir.join(SAVE_SLOT_FILE)
}

pub(crate) fn write_save(path: &Path, save: &SaveGame) -> Result<(), SaveError> {
    let json = serde_json::to_string_pretty(save).map_err(SaveError::Encode)?;
    write_file_atomic(path, json.as_bytes()).map_err(|source| SaveError::Io {
        action: "write",
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn read_save(path: &Path) -> Result<SaveGame, SaveError> {
    let raw = fs::read_to_string(path).map_err(|source| SaveError::Io {
        action: "read",
        path: path.to_path_buf(),
        source,
    })?;
    let save = parse_save_json(&raw)?;
    validate_save(&save)?;
    Ok(save)
}

pub(crate) fn parse_save_json(raw: &str) -> Result<SaveGame, SaveError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, SaveGame>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        SaveError::Parse {
            path: if path.is_empty() { ".".to_string() } else { path },
            source: error.into_inner(),
        }
    })
}

fn invalid(path: String, message: impl Into<String>) -> SaveError {
    SaveError::Invalid {
        path,
        message: message.into(),
    }
}

pub(crate) fn validate_save(save: &SaveGame) -> Result<(), SaveError> {
    if save.save_version != SAVE_VERSION {
        return Err(SaveError::Version {
            expected: SAVE_VERSION,
            actual: save.save_version,
        });
    }
    if save.scene_num < 0 {
        return Err(invalid(
            "scene_num".to_string(),
            format!("expected a non-negative scene, got {}", save.scene_num),
        ));
    }

    let mut seen = HashSet::new();
    for (index, var) in save.vars.iter().enumerate() {
        if !seen.insert(var.name_hash) {
            return Err(invalid(
                format!("vars[{index}].name_hash"),
                format!("duplicate variable {}", format_hash(var.name_hash)),
            ));
        }
        let mut seen_sub = HashSet::new();
        for (sub_index, sub) in var.sub_vars.iter().enumerate() {
            if !seen_sub.insert(sub.sub_name_hash) {
                return Err(invalid(
                    format!("vars[{index}].sub_vars[{sub_index}].sub_name_hash"),
                    format!("duplicate sub-variable {}", format_hash(sub.sub_name_hash)),
                ));
            }
        }
    }

    let expected = seal(save.module, save.scene_num, &save.vars)?;
    if expected != save.checksum {
        return Err(SaveError::Checksum {
            expected,
            actual: save.checksum.clone(),
        });
    }
    Ok(())
}

pub(crate) fn save_game(world: &EntityWorld, root: EntityId, path: &Path) -> Result<(), SaveError> {
    let module = current_module(world, root)
        .ok_or_else(|| invalid("module".to_string(), "no module is running"))?;
    let save = SaveGame::capture(&world.services, module)?;
    write_save(path, &save)?;
    info!(path = %path.display(), module = ?module, vars = save.vars.len(), "game_saved");
    Ok(())
}

/// Validates the slot before touching the world; a rejected save leaves the
/// running game as it was.
pub(crate) fn load_game(world: &mut EntityWorld, root: EntityId, path: &Path) -> Result<ModuleId, SaveError> {
    let save = read_save(path)?;
    world.services.vars = VariableStore::from_saved(&save.vars);
    world.services.game_state.scene_num = save.scene_num;
    create_module(world, root, save.module, -1);
    info!(path = %path.display(), module = ?save.module, scene_num = save.scene_num, "game_loaded");
    Ok(save.module)
}
