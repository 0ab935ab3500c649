#[cfg(unix)]
mod host;
#[cfg(unix)]
mod session;
