pub mod db;
pub mod storage;
pub mod yandex;
pub mod yookassa;
