mod server_config;
