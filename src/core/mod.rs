//! Общие типы ядра: кадр, кандидаты, проверенный штрих-код, каденция сканирования.

pub mod types;
