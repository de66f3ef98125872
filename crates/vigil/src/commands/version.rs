pub fn run() -> anyhow::Result<()> {
    println!("vigil {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_output() {
        assert!(run().is_ok());
    }
}
