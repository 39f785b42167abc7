//! Cross-subsystem flows between whole nodes.

#[cfg(test)]
mod cluster;
#[cfg(test)]
mod flows;
