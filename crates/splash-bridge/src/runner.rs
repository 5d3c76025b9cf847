pub mod platform_factory;
