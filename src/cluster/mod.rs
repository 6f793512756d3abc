pub mod gaussian_mixture;
pub mod init;
pub mod kmeans;
