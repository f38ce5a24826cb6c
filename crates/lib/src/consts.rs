//! Crate-wide constants.

/// Length of the truncated artifact hash.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "condstack.toml";

pub const DEFAULT_OUT_DIR: &str = "synth.out";

pub const DEFAULT_STACK_NAME: &str = "custom-cdk-stack";

/// Environment variable consulted for the synthesis-host identity.
pub const DEFAULT_HOST_VAR: &str = "USER";

/// Build branch label chosen when no arm matches or the host state is unknown.
pub const DEFAULT_BRANCH: &str = "other";

/// Principal that schedule rules invoke compute resources as.
pub const SCHEDULE_PRINCIPAL: &str = "events.amazonaws.com";

pub const INVOKE_ACTION: &str = "lambda:InvokeFunction";

pub const STORAGE_WRITE_ACTION: &str = "s3:PutObject";

pub const ENV_CONFIG: &str = "CONDSTACK_CONFIG";
pub const ENV_OUT_DIR: &str = "CONDSTACK_OUT_DIR";
pub const ENV_HOST_VAR: &str = "CONDSTACK_HOST_VAR";
pub const ENV_HOST_MATCH: &str = "CONDSTACK_HOST_MATCH";
