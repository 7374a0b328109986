pub mod init;
pub mod leaderboard;
pub mod take;
