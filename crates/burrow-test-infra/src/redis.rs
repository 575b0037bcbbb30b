mod server;

pub use server::RedisServer;
