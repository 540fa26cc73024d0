/// Name used for temporary directories and log targets.
pub const APP_NAME: &str = "lifecycle";

/// Descriptor file name for buildpacks.
pub const BUILDPACK_DESCRIPTOR: &str = "buildpack.toml";

/// Descriptor file name for image extensions.
pub const EXTENSION_DESCRIPTOR: &str = "extension.toml";
