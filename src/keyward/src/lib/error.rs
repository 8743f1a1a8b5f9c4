/// The type to represent keyward command results.
pub type KwResult<T = ()> = anyhow::Result<T>;
