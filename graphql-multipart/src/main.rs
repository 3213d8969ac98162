//! Main entry point for CLI command to start the upload server.

fn main() -> anyhow::Result<()> {
    graphql_multipart::main()
}
